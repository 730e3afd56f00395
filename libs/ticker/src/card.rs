use crate::html::escape;

pub const PLACEHOLDER: &str = "N/A";

/// Fraction digits kept when formatting, same as an en-US `toLocaleString`.
const MAX_FRACTION_DIGITS: usize = 3;

/// Enough digits to print any finite `f64` exactly.
const EXACT_FRACTION_DIGITS: usize = 1100;

/// Title and subtitle of one rendered price card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub title: String,
    pub subtitle: String,
}

impl Card {
    pub fn new(symbol: &str, usd: Option<f64>) -> Self {
        let price = usd.map(format_price);
        Self {
            title: symbol.to_uppercase(),
            subtitle: format!("USD: ${}", price.as_deref().unwrap_or(PLACEHOLDER)),
        }
    }

    pub fn render(&self) -> String {
        format!(
            r#"
<div class="card" style="text-align: center; text-decoration: none;">
  <div class="card-content">
    <h3 class="card-title">{}</h3>
    <p class="card-subtitle">{}</p>
  </div>
</div>"#,
            escape(&self.title),
            escape(&self.subtitle)
        )
    }
}

/// Format a price with thousands separators and up to three fraction digits,
/// dropping trailing zeros: `65000.0` -> `65,000`, `1234.5678` -> `1,234.568`.
pub fn format_price(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "∞" } else { "-∞" }.to_string();
    }

    // Round the exact decimal expansion half away from zero, as
    // `toLocaleString` does; `{:.3}` would break exact ties to even.
    let exact = format!("{:.*}", EXACT_FRACTION_DIGITS, value.abs());
    let (whole, fraction) = exact.split_once('.').unwrap_or((exact.as_str(), ""));
    let mut digits: Vec<u8> = whole
        .bytes()
        .chain(fraction.bytes().take(MAX_FRACTION_DIGITS))
        .map(|b| b - b'0')
        .collect();
    if fraction
        .as_bytes()
        .get(MAX_FRACTION_DIGITS)
        .is_some_and(|&b| b >= b'5')
    {
        round_up(&mut digits);
    }

    let split = digits.len() - MAX_FRACTION_DIGITS;
    let int_part: String = digits[..split].iter().map(|d| char::from(b'0' + d)).collect();
    let frac_part: String = digits[split..].iter().map(|d| char::from(b'0' + d)).collect();
    let frac_part = frac_part.trim_end_matches('0');

    let mut out = String::with_capacity(int_part.len() + int_part.len() / 3 + 5);
    if value.is_sign_negative() && digits.iter().any(|&d| d != 0) {
        out.push('-');
    }
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

fn round_up(digits: &mut Vec<u8>) {
    for d in digits.iter_mut().rev() {
        if *d == 9 {
            *d = 0;
        } else {
            *d += 1;
            return;
        }
    }
    digits.insert(0, 1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        assert_eq!(format_price(65000.0), "65,000");
        assert_eq!(format_price(1_234_567.0), "1,234,567");
        assert_eq!(format_price(999.0), "999");
        assert_eq!(format_price(0.0), "0");
    }

    #[test]
    fn keeps_at_most_three_fraction_digits() {
        assert_eq!(format_price(1234.5678), "1,234.568");
        assert_eq!(format_price(0.1), "0.1");
        assert_eq!(format_price(2.5), "2.5");
        assert_eq!(format_price(0.00001), "0");
    }

    #[test]
    fn exact_ties_round_away_from_zero() {
        assert_eq!(format_price(0.0625), "0.063");
        assert_eq!(format_price(2.0625), "2.063");
        assert_eq!(format_price(-2.0625), "-2.063");
        assert_eq!(format_price(0.0005), "0.001");
        // 1.0005 is stored just below the tie
        assert_eq!(format_price(1.0005), "1");
    }

    #[test]
    fn rounding_carries_into_whole_part() {
        assert_eq!(format_price(9.9996), "10");
        assert_eq!(format_price(999.9999), "1,000");
        assert_eq!(format_price(0.9999), "1");
    }

    #[test]
    fn keeps_sign() {
        assert_eq!(format_price(-1500.25), "-1,500.25");
        assert_eq!(format_price(-0.0001), "0");
    }

    #[test]
    fn card_for_known_price() {
        let card = Card::new("bitcoin", Some(65000.0));
        assert_eq!(card.title, "BITCOIN");
        assert_eq!(card.subtitle, "USD: $65,000");
    }

    #[test]
    fn card_without_price_uses_placeholder() {
        let card = Card::new("dogecoin", None);
        assert_eq!(card.title, "DOGECOIN");
        assert_eq!(card.subtitle, "USD: $N/A");
    }

    #[test]
    fn render_contains_title_and_subtitle() {
        let html = Card::new("ethereum", Some(3120.5)).render();
        assert!(html.contains(r#"<h3 class="card-title">ETHEREUM</h3>"#));
        assert!(html.contains(r#"<p class="card-subtitle">USD: $3,120.5</p>"#));
    }

    #[test]
    fn render_escapes_identifier() {
        let html = Card::new("<script>", None).render();
        assert!(html.contains("&lt;SCRIPT&gt;"));
        assert!(!html.contains("<SCRIPT>"));
    }
}
