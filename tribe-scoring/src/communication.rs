//! Communication style compatibility
//!
//! Symmetric lookup table. Identical styles score 0.9, not 1.0.

use tribe_core::CommunicationStyle;

/// Rows/columns follow [`CommunicationStyle::index`]:
/// direct, thoughtful, expressive, supportive, analytical
const STYLE_MATRIX: [[f64; 5]; 5] = [
    [0.9, 0.6, 0.7, 0.5, 0.8],
    [0.6, 0.9, 0.5, 0.8, 0.8],
    [0.7, 0.5, 0.9, 0.8, 0.4],
    [0.5, 0.8, 0.8, 0.9, 0.6],
    [0.8, 0.8, 0.4, 0.6, 0.9],
];

/// Compatibility of two known styles, 0.0 - 1.0
pub fn style_compatibility(a: CommunicationStyle, b: CommunicationStyle) -> f64 {
    STYLE_MATRIX[a.index()][b.index()]
}

/// Compatibility of two possibly-unknown styles; unknown scores 0
pub fn communication_score(a: Option<CommunicationStyle>, b: Option<CommunicationStyle>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => style_compatibility(a, b),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_is_symmetric() {
        for a in CommunicationStyle::ALL {
            for b in CommunicationStyle::ALL {
                assert_eq!(style_compatibility(a, b), style_compatibility(b, a), "{} / {}", a, b);
            }
        }
    }

    #[test]
    fn test_identical_styles_score_point_nine() {
        for style in CommunicationStyle::ALL {
            assert_eq!(style_compatibility(style, style), 0.9);
        }
    }

    #[test]
    fn test_direct_analytical() {
        assert_eq!(
            style_compatibility(CommunicationStyle::Direct, CommunicationStyle::Analytical),
            0.8
        );
    }

    #[test]
    fn test_unknown_style_scores_zero() {
        assert_eq!(communication_score(None, Some(CommunicationStyle::Direct)), 0.0);
    }
}
