/// Statutory annual allowance breakpoints, latest first. Each entry applies to
/// every tax year starting on or after its year.
const ALLOWANCE_BREAKPOINTS: &[(i32, f64)] = &[(2023, 60_000.0)];

const BASE_ALLOWANCE: f64 = 40_000.0;

pub fn allowance_for(year_start: i32) -> f64 {
    ALLOWANCE_BREAKPOINTS
        .iter()
        .find(|(from, _)| year_start >= *from)
        .map(|(_, allowance)| *allowance)
        .unwrap_or(BASE_ALLOWANCE)
}

/// "2023" -> "2023/24"
pub fn tax_year_label(year_start: i32) -> String {
    format!("{year_start}/{:02}", (year_start + 1).rem_euclid(100))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowance_steps_up_from_2023() {
        assert_eq!(allowance_for(2022), 40_000.0);
        assert_eq!(allowance_for(2023), 60_000.0);
        assert_eq!(allowance_for(2031), 60_000.0);
    }

    #[test]
    fn allowance_before_first_breakpoint_uses_base() {
        assert_eq!(allowance_for(1990), 40_000.0);
        assert_eq!(allowance_for(2016), 40_000.0);
    }

    #[test]
    fn labels_wrap_the_century() {
        assert_eq!(tax_year_label(2023), "2023/24");
        assert_eq!(tax_year_label(1999), "1999/00");
        assert_eq!(tax_year_label(2009), "2009/10");
    }
}
