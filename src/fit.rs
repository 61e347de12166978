//! Advisory width check for placeholder values.
//!
//! A value that does not fit is still drawn in full. The check only feeds
//! diagnostics so the position table can be widened.

use crate::font::TextMeasure;
use crate::registry::Position;
use crate::types::Pt;

/// Measured width of `text` at the position's size next to its declared limit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitMeasurement {
    pub width: Pt,
    pub max_width: Option<Pt>,
}

impl FitMeasurement {
    pub fn fits(&self) -> bool {
        match self.max_width {
            Some(max_width) => self.width <= max_width,
            None => true,
        }
    }

    /// Points by which the text exceeds its box, zero when it fits.
    pub fn overflow(&self) -> Pt {
        match self.max_width {
            Some(max_width) if self.width > max_width => self.width - max_width,
            _ => Pt::ZERO,
        }
    }
}

pub fn measure(text: &str, position: &Position, font: &dyn TextMeasure) -> FitMeasurement {
    FitMeasurement {
        width: font.text_width(text, Pt::from_f32(position.size)),
        max_width: position.max_width.map(Pt::from_f32),
    }
}

/// True when `text` is empty, the position declares no width limit, or the
/// measured width is within the limit.
pub fn fits(text: &str, position: &Position, font: &dyn TextMeasure) -> bool {
    if text.is_empty() || position.max_width.is_none() {
        return true;
    }
    measure(text, position, font).fits()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontRegistry;

    struct PerChar(f32);

    impl TextMeasure for PerChar {
        fn text_width(&self, text: &str, font_size: Pt) -> Pt {
            Pt::from_f32(font_size.to_f32() * self.0 * text.chars().count() as f32)
        }
    }

    #[test]
    fn long_aircraft_model_does_not_fit_narrow_box() {
        let fonts = FontRegistry::new();
        let helvetica = fonts.require("Helvetica").expect("helvetica");
        let position = Position::new(1, 103.0, 248.0, 11.0).with_max_width(100.0);
        assert!(!fits("Cessna 172S Skyhawk", &position, &helvetica));
        let measured = measure("Cessna 172S Skyhawk", &position, &helvetica);
        assert!(measured.overflow() > Pt::ZERO);
    }

    #[test]
    fn empty_text_and_unbounded_positions_always_fit() {
        let font = PerChar(0.6);
        let bounded = Position::new(1, 0.0, 0.0, 10.0).with_max_width(1.0);
        let unbounded = Position::new(1, 0.0, 0.0, 10.0);
        assert!(fits("", &bounded, &font));
        assert!(fits("a very long value that would overflow anything", &unbounded, &font));
    }

    #[test]
    fn boundary_width_counts_as_fitting() {
        let font = PerChar(0.5);
        // 4 chars * 10pt * 0.5 = 20pt.
        let exact = Position::new(1, 0.0, 0.0, 10.0).with_max_width(20.0);
        let short = Position::new(1, 0.0, 0.0, 10.0).with_max_width(19.5);
        assert!(fits("abcd", &exact, &font));
        assert!(!fits("abcd", &short, &font));
        assert_eq!(measure("abcd", &exact, &font).overflow(), Pt::ZERO);
    }
}
