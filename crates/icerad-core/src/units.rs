//! Internal unit system.
//!
//! All quantities inside the suite are expressed in a fixed set of base
//! units: time in nanoseconds, frequency in gigahertz, voltage in volts,
//! length in meters, energy in electronvolts, angles in radians. The
//! constants here are multiplicative conversion factors: multiply by a
//! constant when bringing a value in, divide when printing it out.
//!
//! ```rust
//! use icerad_core::units;
//!
//! let bandwidth = 500.0 * units::MHZ;
//! assert!((bandwidth - 0.5 * units::GHZ).abs() < 1e-12);
//! ```
//!
//! The choice of ns/GHz keeps the product `frequency * time` dimensionless
//! without scale factors, which every FFT convention in `icerad-signal`
//! relies on.

/// Nanosecond (base time unit).
pub const NS: f64 = 1.0;
/// Microsecond.
pub const US: f64 = 1e3;
/// Millisecond.
pub const MS: f64 = 1e6;
/// Second.
pub const S: f64 = 1e9;

/// Gigahertz (base frequency unit).
pub const GHZ: f64 = 1.0;
/// Megahertz.
pub const MHZ: f64 = 1e-3;
/// Kilohertz.
pub const KHZ: f64 = 1e-6;
/// Hertz.
pub const HZ: f64 = 1e-9;

/// Volt (base voltage unit).
pub const V: f64 = 1.0;
/// Millivolt.
pub const MV: f64 = 1e-3;
/// Microvolt.
pub const UV: f64 = 1e-6;

/// Meter (base length unit).
pub const M: f64 = 1.0;
/// Kilometer.
pub const KM: f64 = 1e3;
/// Centimeter.
pub const CM: f64 = 1e-2;

/// Electronvolt (base energy unit).
pub const EV: f64 = 1.0;
/// Giga-electronvolt.
pub const GEV: f64 = 1e9;
/// Peta-electronvolt.
pub const PEV: f64 = 1e15;
/// Exa-electronvolt.
pub const EEV: f64 = 1e18;

/// Radian (base angle unit).
pub const RAD: f64 = 1.0;
/// Degree.
pub const DEG: f64 = std::f64::consts::PI / 180.0;

/// Speed of light in vacuum, m/ns.
pub const C_LIGHT: f64 = 0.299_792_458;

/// Vacuum permittivity times the speed of light, in (eV / m^2) per
/// (V/m)^2 / ns. Converts an integrated squared field strength into an
/// energy fluence.
pub const EPSILON0_C: f64 = 2.654_417_29e-3 * 6.241_509_34e18 * 1e-9;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_time_product_is_dimensionless() {
        // 500 MHz * 2 ns = 1 cycle
        assert!((500.0 * MHZ * 2.0 * NS - 1.0).abs() < 1e-12);
    }

    #[test]
    fn second_roundtrip() {
        assert!((1.0 * S * HZ - 1.0).abs() < 1e-12);
    }

    #[test]
    fn light_travel_time() {
        // ~3.34 ns per meter
        let t = 1.0 * M / C_LIGHT;
        assert!((t - 3.3356).abs() < 1e-3);
    }
}
