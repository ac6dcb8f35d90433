use anyhow::{anyhow, Context, Result};

/// Fixed unit conversion: account credit is in toman, the quote is in rial.
const RIAL_PER_UNIT: f64 = 10.0;
/// Flat 10% markup on top of the quoted rate.
const MARKUP: f64 = 1.10;

/// Quotes the TRX price off the market-stats endpoint and converts a
/// top-up amount into TRX. The transfer itself is manual and never
/// verified by the bot.
#[derive(Clone)]
pub struct PayService {
    http: reqwest::Client,
    api_url: String,
}

impl PayService {
    pub fn new(api_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url,
        }
    }

    /// Latest TRX/IRT rate. Any failure aborts the calling flow; there are
    /// no retries.
    pub async fn latest_trx_price(&self) -> Result<f64> {
        let response = self
            .http
            .post(&self.api_url)
            .form(&[("srcCurrency", "trx"), ("dstCurrency", "irt")])
            .send()
            .await
            .context("Price feed request failed")?
            .error_for_status()
            .context("Price feed returned an error status")?;

        let body: serde_json::Value = response
            .json()
            .await
            .context("Price feed returned malformed JSON")?;

        let latest = &body["stats"]["trx-irt"]["latest"];
        latest
            .as_f64()
            .or_else(|| latest.as_str().and_then(|s| s.parse::<f64>().ok()))
            .ok_or_else(|| anyhow!("Price feed response is missing stats.trx-irt.latest"))
    }

    /// TRX to transfer for a `toman` top-up at `price` rial per TRX.
    pub fn trx_amount(toman: f64, price: f64) -> f64 {
        (toman * RIAL_PER_UNIT / price) * MARKUP
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trx_amount_applies_unit_conversion_and_markup() {
        // 30000 toman at 3000 rial/TRX: 300000 / 3000 = 100 TRX, +10%.
        let trx = PayService::trx_amount(30000.0, 3000.0);
        assert!((trx - 110.0).abs() < 1e-9);
    }

    #[test]
    fn trx_amount_scales_linearly() {
        let one = PayService::trx_amount(10000.0, 5500.0);
        let five = PayService::trx_amount(50000.0, 5500.0);
        assert!((five - one * 5.0).abs() < 1e-9);
    }
}
