//! Lenient parsing of free-text sub-enums
//!
//! Legacy records carry bolus types, glucose types and units as free text.
//! A value is matched against the canonical short forms first, then against the
//! variant names ignoring case. Anything else becomes `None`, never an error.

use crate::domain::records::{BolusType, CalculationType, GlucoseType, GlucoseUnit};

/// Enums that can be parsed from legacy free text
pub trait LenientEnum: Copy + 'static {
    /// Canonical abbreviations used by uploaders
    const SHORT_FORMS: &'static [(&'static str, Self)];

    /// Symbolic variant names
    const VARIANTS: &'static [(&'static str, Self)];
}

/// Parses a free-text value into `T`
///
/// # Examples
///
/// ```
/// use nocturne_decomposer::core::transform::parse::parse_lenient;
/// use nocturne_decomposer::domain::{GlucoseType, GlucoseUnit};
///
/// assert_eq!(parse_lenient::<GlucoseUnit>(Some("mg/dl")), Some(GlucoseUnit::MgDl));
/// assert_eq!(parse_lenient::<GlucoseType>(Some("FINGER")), Some(GlucoseType::Finger));
/// assert_eq!(parse_lenient::<GlucoseType>(Some("toe")), None);
/// ```
pub fn parse_lenient<T: LenientEnum>(raw: Option<&str>) -> Option<T> {
    let value = raw.map(str::trim).filter(|v| !v.is_empty())?;

    lookup(T::SHORT_FORMS, value).or_else(|| lookup(T::VARIANTS, value))
}

fn lookup<T: Copy>(table: &[(&str, T)], value: &str) -> Option<T> {
    table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(value))
        .map(|(_, variant)| *variant)
}

impl LenientEnum for BolusType {
    const SHORT_FORMS: &'static [(&'static str, Self)] = &[
        ("n", Self::Normal),
        ("s", Self::Square),
        ("d", Self::Dual),
        ("combo", Self::Dual),
        ("extended", Self::Square),
        ("ds", Self::Dual),
    ];
    const VARIANTS: &'static [(&'static str, Self)] = &[
        ("Normal", Self::Normal),
        ("Square", Self::Square),
        ("Dual", Self::Dual),
    ];
}

impl LenientEnum for GlucoseType {
    const SHORT_FORMS: &'static [(&'static str, Self)] = &[
        ("fingerstick", Self::Finger),
        ("bg", Self::Finger),
        ("cgm", Self::Sensor),
    ];
    const VARIANTS: &'static [(&'static str, Self)] = &[
        ("Finger", Self::Finger),
        ("Sensor", Self::Sensor),
        ("Manual", Self::Manual),
    ];
}

impl LenientEnum for GlucoseUnit {
    const SHORT_FORMS: &'static [(&'static str, Self)] = &[
        ("mg/dl", Self::MgDl),
        ("mg", Self::MgDl),
        ("mmol/l", Self::Mmol),
    ];
    const VARIANTS: &'static [(&'static str, Self)] =
        &[("MgDl", Self::MgDl), ("Mmol", Self::Mmol)];
}

impl LenientEnum for CalculationType {
    const SHORT_FORMS: &'static [(&'static str, Self)] = &[
        ("auto", Self::Automatic),
        ("smb", Self::Automatic),
        ("suggestion", Self::Suggested),
    ];
    const VARIANTS: &'static [(&'static str, Self)] = &[
        ("Suggested", Self::Suggested),
        ("Manual", Self::Manual),
        ("Automatic", Self::Automatic),
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Some("mg/dl"), Some(GlucoseUnit::MgDl) ; "lowercase mg per dl")]
    #[test_case(Some("mg/dL"), Some(GlucoseUnit::MgDl) ; "mixed case mg per dl")]
    #[test_case(Some("mmol"), Some(GlucoseUnit::Mmol))]
    #[test_case(Some("mmol/L"), Some(GlucoseUnit::Mmol))]
    #[test_case(Some("MGDL"), Some(GlucoseUnit::MgDl))]
    #[test_case(Some("furlongs"), None)]
    #[test_case(Some(""), None)]
    #[test_case(None, None)]
    fn test_glucose_unit(raw: Option<&str>, expected: Option<GlucoseUnit>) {
        assert_eq!(parse_lenient::<GlucoseUnit>(raw), expected);
    }

    #[test_case("Finger", Some(GlucoseType::Finger) ; "capitalized finger")]
    #[test_case("finger", Some(GlucoseType::Finger) ; "lowercase finger")]
    #[test_case(" Sensor ", Some(GlucoseType::Sensor))]
    #[test_case("manual", Some(GlucoseType::Manual))]
    #[test_case("cgm", Some(GlucoseType::Sensor))]
    #[test_case("earlobe", None)]
    fn test_glucose_type(raw: &str, expected: Option<GlucoseType>) {
        assert_eq!(parse_lenient::<GlucoseType>(Some(raw)), expected);
    }

    #[test_case("normal", Some(BolusType::Normal))]
    #[test_case("combo", Some(BolusType::Dual))]
    #[test_case("SQUARE", Some(BolusType::Square))]
    #[test_case("triple", None)]
    fn test_bolus_type(raw: &str, expected: Option<BolusType>) {
        assert_eq!(parse_lenient::<BolusType>(Some(raw)), expected);
    }

    #[test_case("Suggested", Some(CalculationType::Suggested))]
    #[test_case("automatic", Some(CalculationType::Automatic))]
    #[test_case("auto", Some(CalculationType::Automatic))]
    #[test_case("guess", None)]
    fn test_calculation_type(raw: &str, expected: Option<CalculationType>) {
        assert_eq!(parse_lenient::<CalculationType>(Some(raw)), expected);
    }
}
