//! Intent Classifier
//!
//! Maps a free-text message to an [`Intent`] by case-insensitive keyword
//! membership. Keyword sets are checked in priority order:
//! balance/movements, then loans, then general banking info.

use crate::models::Intent;

/// Static keyword lists — zero allocation
const BALANCE_KEYWORDS: &[&str] = &[
    "saldo", "cuánto tengo", "en mi cuenta", "últimos movimientos", "movimientos",
    "estado de cuenta", "balance", "ver mi saldo", "consultar saldo", "mostrar saldo",
    "qué saldo tengo", "ver movimientos", "consultar movimientos", "mostrar movimientos",
    "historial de cuenta", "detalle de mi cuenta", "actividad de cuenta",
    "transacciones recientes", "dinero en cuenta", "plata en cuenta",
];

const LOAN_KEYWORDS: &[&str] = &[
    "préstamo", "prestamos", "mis prestamos", "ver prestamos", "estado de mi préstamo",
    "cuánto debo", "deuda préstamo", "préstamos activos",
];

const GENERAL_KEYWORDS: &[&str] = &[
    "tarjetas ofrecen", "conviene un plazo fijo", "cuál es la tasa para préstamos personales",
    "información general", "productos bancarios", "general", "tipos de tarjeta",
    "tarjeta de débito", "tarjeta de crédito", "beneficios tarjeta", "costo tarjeta",
    "comisiones tarjeta", "tarjeta internacional", "tarjeta nacional", "tasas de interés",
    "tasas plazo fijo",
];

/// Intent classifier
pub struct IntentClassifier;

impl IntentClassifier {
    /// Classify a message; first matching keyword set wins.
    pub fn classify(text: &str) -> Intent {
        let text = text.trim();
        if text.is_empty() {
            return Intent::Fallback;
        }

        let lowered = text.to_lowercase();

        if contains_any(&lowered, BALANCE_KEYWORDS) {
            Intent::BalanceQuery
        } else if contains_any(&lowered, LOAN_KEYWORDS) {
            Intent::LoanQuery
        } else if contains_any(&lowered, GENERAL_KEYWORDS) {
            Intent::GeneralInfo
        } else {
            Intent::Fallback
        }
    }
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| text.contains(*kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_queries() {
        let cases = vec![
            "saldo",
            "¿Cuánto tengo en mi cuenta?",
            "quiero ver mis ÚLTIMOS MOVIMIENTOS",
            "Balance por favor",
        ];

        for c in cases {
            assert_eq!(IntentClassifier::classify(c), Intent::BalanceQuery, "{}", c);
        }
    }

    #[test]
    fn test_loan_queries() {
        let cases = vec!["cuánto debo", "Mis prestamos", "estado de mi Préstamo"];

        for c in cases {
            assert_eq!(IntentClassifier::classify(c), Intent::LoanQuery, "{}", c);
        }
    }

    #[test]
    fn test_general_queries() {
        let cases = vec![
            "qué tarjetas ofrecen",
            "¿me conviene un plazo fijo?",
            "tasas de interés",
        ];

        for c in cases {
            assert_eq!(IntentClassifier::classify(c), Intent::GeneralInfo, "{}", c);
        }
    }

    #[test]
    fn test_priority_order() {
        // balance beats loan
        assert_eq!(
            IntentClassifier::classify("saldo y préstamos activos"),
            Intent::BalanceQuery
        );
        // balance beats general
        assert_eq!(
            IntentClassifier::classify("saldo de la tarjeta de crédito"),
            Intent::BalanceQuery
        );
        // loan beats general
        assert_eq!(
            IntentClassifier::classify("cuánto debo de la tarjeta de crédito"),
            Intent::LoanQuery
        );
    }

    #[test]
    fn test_edge_cases() {
        assert_eq!(IntentClassifier::classify(""), Intent::Fallback);
        assert_eq!(IntentClassifier::classify("   \t\n"), Intent::Fallback);
        assert_eq!(IntentClassifier::classify("hola"), Intent::Fallback);
        assert_eq!(IntentClassifier::classify("1234"), Intent::Fallback);
    }
}
