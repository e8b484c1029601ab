use chrono::{Local, NaiveTime, Timelike};

/// Time of day as a formula the remote evaluates, e.g. `=TIME(14, 5, 00)`.
/// Seconds are always zero.
pub fn time_of_day_formula(time: NaiveTime) -> String {
    format!("=TIME({}, {}, 00)", time.hour(), time.minute())
}

pub fn current_time_formula() -> String {
    time_of_day_formula(Local::now().time())
}

/// Splits `8, 7.5,,4` into trimmed cells. An empty input yields one empty
/// cell, matching what the user typed.
pub fn split_row_input(input: &str) -> Vec<String> {
    input.split(',').map(|s| s.trim().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_formula() {
        let t = NaiveTime::from_hms_opt(14, 5, 59).unwrap();
        assert_eq!(time_of_day_formula(t), "=TIME(14, 5, 00)");

        let t = NaiveTime::from_hms_opt(0, 0, 0).unwrap();
        assert_eq!(time_of_day_formula(t), "=TIME(0, 0, 00)");
    }

    #[test]
    fn test_split_row_input() {
        assert_eq!(split_row_input("8, 7.5,,4"), vec!["8", "7.5", "", "4"]);
        assert_eq!(split_row_input(""), vec![""]);
    }
}
