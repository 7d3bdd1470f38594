use once_cell::sync::Lazy;
use regex::Regex;

static NON_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("static regex"));

/// `"Which regions have the highest population?"` → `"which-regions-have-the-highest-population"`
pub fn slugify(title: &str) -> String {
    let lower = title.to_lowercase();
    NON_SLUG.replace_all(&lower, "-").trim_matches('-').to_string()
}

/// `1439323776` → `"1,439,323,776"`
pub fn group_thousands(n: i128) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Rounds to the nearest integer, then groups. Saturates outside the `i128` range.
pub fn group_thousands_f64(v: f64) -> String {
    group_thousands(v.round() as i128)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs() {
        assert_eq!(
            slugify("What's the total population in this world?"),
            "what-s-the-total-population-in-this-world"
        );
        assert_eq!(slugify("  World Population 2020-2030 "), "world-population-2020-2030");
    }

    #[test]
    fn thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(-383_840), "-383,840");
        assert_eq!(group_thousands(7_794_798_739), "7,794,798,739");
        assert_eq!(group_thousands_f64(4_299_438_618.6), "4,299,438,619");
    }

    #[test]
    fn thousands_beyond_i64() {
        assert_eq!(
            group_thousands(i128::from(u64::MAX)),
            "18,446,744,073,709,551,615"
        );
        assert_eq!(
            group_thousands(i128::from(i64::MAX) + 1),
            "9,223,372,036,854,775,808"
        );
        assert_eq!(
            group_thousands(i128::MIN),
            "-170,141,183,460,469,231,731,687,303,715,884,105,728"
        );
    }
}
