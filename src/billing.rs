use log::warn;
use serde::{Deserialize, Serialize};

use crate::catalog::TestCatalog;
use crate::config::validate_discount;
use crate::error::LimsResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub code: String,
    pub name: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub patient_id: String,
    pub currency: String,
    pub lines: Vec<InvoiceLine>,
    pub subtotal: f64,
    pub discount_percent: f64,
    pub discount: f64,
    pub total: f64,
}

impl Invoice {
    /// Price the selected tests from the catalog.
    ///
    /// Codes missing from the catalog are billed at zero.
    pub fn build(
        catalog: &TestCatalog,
        patient_id: &str,
        codes: &[String],
        discount_percent: f64,
        currency: &str,
    ) -> LimsResult<Self> {
        validate_discount(discount_percent)?;

        let lines: Vec<InvoiceLine> = codes
            .iter()
            .map(|code| match catalog.get(code) {
                Some(panel) => InvoiceLine {
                    code: panel.code.clone(),
                    name: panel.name.clone(),
                    price: round_money(panel.price),
                },
                None => {
                    warn!("Test {} is not in the catalog; billed at zero", code);
                    InvoiceLine {
                        code: code.trim().to_string(),
                        name: code.trim().to_string(),
                        price: 0.0,
                    }
                }
            })
            .collect();

        let subtotal = round_money(lines.iter().map(|l| l.price).sum());
        let discount = round_money(subtotal * discount_percent / 100.0);

        Ok(Self {
            patient_id: patient_id.to_string(),
            currency: currency.to_string(),
            lines,
            subtotal,
            discount_percent,
            discount,
            total: round_money(subtotal - discount),
        })
    }
}

fn round_money(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TestPanel;
    use crate::error::LimsError;
    use approx::assert_relative_eq;

    fn catalog() -> TestCatalog {
        let mut fbc = TestPanel::single("FBC", "Full Blood Count", "", "");
        fbc.price = 1200.0;
        let mut lipid = TestPanel::single("LIPID", "Lipid Profile", "mg/dL", "");
        lipid.price = 2850.5;
        TestCatalog::new(vec![fbc, lipid]).unwrap()
    }

    fn codes(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_invoice_totals() {
        let invoice = Invoice::build(&catalog(), "P-001", &codes(&["FBC", "lipid"]), 10.0, "LKR").unwrap();
        assert_eq!(invoice.lines.len(), 2);
        assert_eq!(invoice.lines[1].code, "LIPID");
        assert_relative_eq!(invoice.subtotal, 4050.5, epsilon = 1e-9);
        assert_relative_eq!(invoice.discount, 405.05, epsilon = 1e-9);
        assert_relative_eq!(invoice.total, 3645.45, epsilon = 1e-9);
    }

    #[test]
    fn test_unknown_code_billed_at_zero() {
        let invoice = Invoice::build(&catalog(), "P-001", &codes(&["FBC", "XYZ"]), 0.0, "LKR").unwrap();
        assert_relative_eq!(invoice.lines[1].price, 0.0);
        assert_relative_eq!(invoice.total, 1200.0);
    }

    #[test]
    fn test_rejects_out_of_range_discount() {
        let result = Invoice::build(&catalog(), "P-001", &codes(&["FBC"]), 150.0, "LKR");
        assert!(matches!(result, Err(LimsError::InvalidDraft(_))));
    }
}
