use std::fmt;

use ti_tensor::ops;

/// Decoded result of one prediction.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// Softmax probabilities in output order. `shown` is how many leading
    /// values the text summary includes.
    Probabilities { values: Vec<f32>, shown: usize },
    Label(String),
}

impl Output {
    pub fn probabilities(&self) -> Option<&[f32]> {
        match self {
            Output::Probabilities { values, .. } => Some(values),
            Output::Label(_) => None,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Output::Label(l) => Some(l),
            Output::Probabilities { .. } => None,
        }
    }

    /// The `n` most probable entries as `(index, probability)`, highest
    /// first. Empty for label outputs.
    pub fn top_classes(&self, n: usize) -> Vec<(usize, f32)> {
        self.probabilities()
            .map(|p| ops::top_k(p, n))
            .unwrap_or_default()
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Probabilities { values, shown } => {
                write!(f, "Probabilities: ")?;
                for (i, p) in values.iter().take(*shown).enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:.4}", p)?;
                }
                Ok(())
            }
            Output::Label(l) => f.write_str(l),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_probabilities() {
        let out = Output::Probabilities {
            values: vec![0.25, 0.75, 0.5, 0.5],
            shown: 3,
        };
        assert_eq!(out.to_string(), "Probabilities: 0.2500, 0.7500, 0.5000");
    }

    #[test]
    fn test_display_label() {
        assert_eq!(Output::Label("Positive".into()).to_string(), "Positive");
    }

    #[test]
    fn test_top_classes() {
        let out = Output::Probabilities {
            values: vec![0.1, 0.6, 0.3],
            shown: 3,
        };
        assert_eq!(out.top_classes(2), vec![(1, 0.6), (2, 0.3)]);
        assert!(Output::Label("x".into()).top_classes(2).is_empty());
        assert_eq!(out.label(), None);
    }
}
