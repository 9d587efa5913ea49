use crate::serialization::text::format_float;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A chemical element with optional isotope mass number and amount.
///
/// The textual form is `"[isotope]Symbol[ amount]"`, e.g. `"4He"`,
/// `"C 1.0"` or `"12C 0.5"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Element {
    pub symbol: String,
    pub isotope: Option<u32>,
    pub amount: Option<f64>,
}

impl Element {
    pub fn new(symbol: impl Into<String>, isotope: Option<u32>, amount: Option<f64>) -> Self {
        Self {
            symbol: symbol.into(),
            isotope,
            amount,
        }
    }

    /// Element text without the amount, used in file names and map keys.
    pub fn label(&self) -> String {
        match self.isotope {
            Some(isotope) => format!("{}{}", isotope, self.symbol),
            None => self.symbol.clone(),
        }
    }
}

impl FromStr for Element {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        let digits_end = text
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(text.len());
        let (isotope, rest) = text.split_at(digits_end);
        if isotope.len() > 3 {
            return Err(format!("isotope number too long in '{}'", text));
        }

        let letters_end = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        let (symbol, tail) = rest.split_at(letters_end);
        if symbol.is_empty() || symbol.len() > 2 {
            return Err(format!("incorrect element string '{}'", text));
        }

        let isotope = if isotope.is_empty() {
            None
        } else {
            Some(
                isotope
                    .parse::<u32>()
                    .map_err(|err| format!("bad isotope in '{}': {}", text, err))?,
            )
        };

        let tail = tail.trim();
        let amount = if tail.is_empty() {
            None
        } else {
            Some(
                tail.parse::<f64>()
                    .map_err(|err| format!("bad amount in '{}': {}", text, err))?,
            )
        };

        Ok(Self::new(symbol, isotope, amount))
    }
}

impl TryFrom<String> for Element {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Element> for String {
    fn from(element: Element) -> Self {
        element.to_string()
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let amount = self.amount.filter(|amount| *amount != 0.0);
        match amount {
            Some(amount) => write!(f, "{} {}", self.label(), format_float(amount)),
            None => f.write_str(&self.label()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_isotope_symbol_and_amount() {
        let element: Element = "12C 0.5".parse().unwrap();
        assert_eq!(element, Element::new("C", Some(12), Some(0.5)));
        assert_eq!(element.to_string(), "12C 0.5");
    }

    #[test]
    fn plain_symbol_round_trips() {
        let element: Element = "Si".parse().unwrap();
        assert_eq!(element.isotope, None);
        assert_eq!(element.to_string(), "Si");
    }

    #[test]
    fn integral_amount_keeps_decimal_point() {
        let element: Element = "4He 3".parse().unwrap();
        assert_eq!(element.to_string(), "4He 3.0");
        assert_eq!(element.label(), "4He");
    }

    #[test]
    fn rejects_empty_and_garbage() {
        assert!("".parse::<Element>().is_err());
        assert!("1234He".parse::<Element>().is_err());
        assert!("He x".parse::<Element>().is_err());
    }
}
