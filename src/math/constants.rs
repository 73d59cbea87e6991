//! Physical constants (CODATA 2018, SI units).

/// Pi.
pub const PI: f64 = 3.141_592_653_589_793_238_462_643_383_279_502_884_197_2;

/// The square root of Pi.
pub const SQRT_OF_PI: f64 = 1.772_453_850_905_516_027_298_167_483_341_145_182_797_5;

/// The speed of light in vacuum (m s-1).
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// The electron mass (kg).
pub const ELECTRON_MASS: f64 = 9.109_383_701_5E-31;

/// The elementary charge (C).
pub const ELEMENTARY_CHARGE: f64 = 1.602_176_634E-19;

/// The electric constant (F m-1).
pub const ELECTRIC_CONSTANT: f64 = 8.854_187_812_8E-12;

/// One millionth.
pub const MICRO: f64 = 1.0E-06;
