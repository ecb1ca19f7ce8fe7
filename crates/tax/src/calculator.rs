use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use quotedesk_core::ValueObject;

/// Tax configuration.
///
/// `home_jurisdiction` is the business's own tax jurisdiction. Sales billed
/// into the same jurisdiction split each rate into equal CGST and SGST
/// halves; sales billed elsewhere carry the full rate as IGST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxConfig {
    pub home_jurisdiction: String,
}

impl Default for TaxConfig {
    fn default() -> Self {
        Self {
            home_jurisdiction: "maharashtra".to_string(),
        }
    }
}

/// Raw per-line figures as submitted by a caller.
///
/// Fields are optional: missing or non-finite values coerce to 0 rather than
/// failing, so a half-filled draft line still produces a usable summary.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LineFigures {
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub tax_rate: Option<f64>,
}

impl LineFigures {
    pub fn new(quantity: f64, unit_price: f64, tax_rate: f64) -> Self {
        Self {
            quantity: Some(quantity),
            unit_price: Some(unit_price),
            tax_rate: Some(tax_rate),
        }
    }
}

/// One line with its server-computed amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComputedLine {
    pub quantity: f64,
    pub unit_price: f64,
    pub tax_rate: f64,
    /// quantity × unit_price.
    pub amount: f64,
}

impl ValueObject for ComputedLine {}

/// Aggregate output of a tax computation.
///
/// All figures are unrounded f64; rounding is presentation-only via
/// [`TaxSummary::rounded`] so repeated recomputation never compounds
/// rounding error.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaxSummary {
    pub lines: Vec<ComputedLine>,
    pub total_quantity: f64,
    /// Pre-tax sum of all line amounts.
    pub total_amount: f64,
    pub cgst: f64,
    pub sgst: f64,
    pub igst: f64,
    /// cgst + sgst + igst.
    pub tax_amount: f64,
    /// total_amount + tax_amount.
    pub grand_total: f64,
}

impl ValueObject for TaxSummary {}

impl TaxSummary {
    /// Two-decimal copy for display/reporting. Internal storage keeps the
    /// unrounded figures.
    pub fn rounded(&self) -> TaxSummary {
        TaxSummary {
            lines: self
                .lines
                .iter()
                .map(|l| ComputedLine {
                    quantity: round2(l.quantity),
                    unit_price: round2(l.unit_price),
                    tax_rate: round2(l.tax_rate),
                    amount: round2(l.amount),
                })
                .collect(),
            total_quantity: round2(self.total_quantity),
            total_amount: round2(self.total_amount),
            cgst: round2(self.cgst),
            sgst: round2(self.sgst),
            igst: round2(self.igst),
            tax_amount: round2(self.tax_amount),
            grand_total: round2(self.grand_total),
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn num(v: Option<f64>) -> f64 {
    v.filter(|x| x.is_finite()).unwrap_or(0.0)
}

/// Jurisdiction comparison ignores case and all whitespace, so
/// `" Tamil Nadu "` and `"tamilnadu"` are the same jurisdiction.
fn normalize_jurisdiction(s: &str) -> String {
    s.split_whitespace().collect::<String>().to_lowercase()
}

/// Pure, deterministic tax computation. No I/O; identical input always
/// yields bit-identical output.
#[derive(Debug, Clone)]
pub struct TaxCalculator {
    home: String,
}

impl TaxCalculator {
    pub fn new(config: TaxConfig) -> Self {
        Self {
            home: normalize_jurisdiction(&config.home_jurisdiction),
        }
    }

    /// Whether the given billing jurisdiction is the home jurisdiction.
    pub fn is_home(&self, jurisdiction: &str) -> bool {
        normalize_jurisdiction(jurisdiction) == self.home
    }

    /// Compute per-line amounts and the CGST/SGST/IGST breakdown.
    ///
    /// Lines with a non-negative rate and a strictly positive amount are
    /// grouped by rate for the tax breakdown; zero- and negative-amount
    /// lines still contribute to `total_amount` but never to tax. A rate of
    /// exactly 0 yields a group with zero tax.
    pub fn compute(&self, lines: &[LineFigures], jurisdiction: &str) -> TaxSummary {
        let mut computed = Vec::with_capacity(lines.len());
        let mut total_quantity = 0.0f64;
        let mut total_amount = 0.0f64;

        // Taxable amount per rate, keyed by the rate's IEEE-754 bits: for
        // non-negative rates the bit pattern orders like the value, so
        // iteration is deterministic.
        let mut groups: BTreeMap<u64, f64> = BTreeMap::new();

        for line in lines {
            let quantity = num(line.quantity);
            let unit_price = num(line.unit_price);
            let tax_rate = num(line.tax_rate);
            let amount = quantity * unit_price;

            total_quantity += quantity;
            total_amount += amount;

            if tax_rate >= 0.0 && amount > 0.0 {
                *groups.entry(tax_rate.to_bits()).or_insert(0.0) += amount;
            }

            computed.push(ComputedLine {
                quantity,
                unit_price,
                tax_rate,
                amount,
            });
        }

        let intra = self.is_home(jurisdiction);
        let mut cgst = 0.0f64;
        let mut sgst = 0.0f64;
        let mut igst = 0.0f64;

        for (bits, taxable) in groups {
            let rate = f64::from_bits(bits);
            if intra {
                let half = taxable * (rate / 2.0) / 100.0;
                cgst += half;
                sgst += half;
            } else {
                igst += taxable * rate / 100.0;
            }
        }

        let tax_amount = cgst + sgst + igst;

        TaxSummary {
            lines: computed,
            total_quantity,
            total_amount,
            cgst,
            sgst,
            igst,
            tax_amount,
            grand_total: total_amount + tax_amount,
        }
    }
}

impl Default for TaxCalculator {
    fn default() -> Self {
        Self::new(TaxConfig::default())
    }
}
