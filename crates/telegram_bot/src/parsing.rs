//! Single-line expense parser.
//!
//! Grammar: `<amount> <category...> [comment...] [date] [account...]`, all
//! whitespace-separated. The category is matched greedily against the known
//! category names (up to four words), date and account are recognised
//! scanning from the right, and whatever is left over becomes the comment.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use ledger::MoneyCents;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Пустое сообщение")]
    Empty,
    #[error("Нужно минимум два слова: сумма и категория")]
    TooFewTokens,
    #[error("Некорректная сумма: '{0}'")]
    BadAmount(String),
}

/// Result of parsing one fast-entry line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastExpense {
    pub amount: MoneyCents,
    /// Category text as the user typed it (joined by single spaces).
    pub category: String,
    /// Whether the category matched a known name.
    pub category_known: bool,
    pub comment: Option<String>,
    pub date: NaiveDate,
    /// Account name as typed, when a suffix matched a known account.
    pub account: Option<String>,
}

/// Parses a strictly positive amount, accepting `.` or `,` separators.
pub fn parse_amount(input: &str) -> Option<MoneyCents> {
    let amount: MoneyCents = input.trim().parse().ok()?;
    amount.is_positive().then_some(amount)
}

pub fn parse_fast_expense(
    input: &str,
    expense_categories: &[String],
    account_names: &[String],
    today: NaiveDate,
) -> Result<FastExpense, ParseError> {
    let tokens: Vec<&str> = input.split_whitespace().collect();
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }
    if tokens.len() < 2 {
        return Err(ParseError::TooFewTokens);
    }

    let amount =
        parse_amount(tokens[0]).ok_or_else(|| ParseError::BadAmount(tokens[0].to_string()))?;

    let known: HashMap<String, &str> = expense_categories
        .iter()
        .map(|name| (name.to_lowercase(), name.as_str()))
        .collect();

    // Known category windows are scanned right-to-left over every end
    // position, longest window (up to 4 tokens) first, anywhere after the
    // amount. "кафе у дома" beats "кафе" when both are known.
    let mut category = tokens[1].to_string();
    let mut category_known = false;
    let mut cat_start = 1;
    let mut cat_end = 1;
    'scan: for end in (1..tokens.len()).rev() {
        for len in (1..=usize::min(4, end)).rev() {
            let start = end - len + 1;
            let candidate = tokens[start..=end].join(" ");
            if known.contains_key(&candidate.to_lowercase()) {
                category = candidate;
                category_known = true;
                cat_start = start;
                cat_end = end;
                break 'scan;
            }
        }
    }

    // Rightmost token that parses as a date.
    let mut date = None;
    let mut date_idx = None;
    for i in ((cat_end + 1)..tokens.len()).rev() {
        if let Some(parsed) = parse_date_token(tokens[i], today) {
            date = Some(parsed);
            date_idx = Some(i);
            break;
        }
    }

    // Longest trailing run of tokens naming a known account, skipping the
    // date token if it sits inside the window.
    let accounts_lower: Vec<String> = account_names.iter().map(|n| n.to_lowercase()).collect();
    let mut account = None;
    let mut account_start = None;
    'acc: for i in ((cat_end + 1)..tokens.len()).rev() {
        if Some(i) == date_idx {
            continue;
        }
        for len in (1..=(i - cat_end)).rev() {
            let start = i + 1 - len;
            if date_idx.is_some_and(|d| (start..=i).contains(&d)) {
                continue;
            }
            let candidate = tokens[start..=i].join(" ");
            if accounts_lower.contains(&candidate.to_lowercase()) {
                account = Some(candidate);
                account_start = Some(start);
                break 'acc;
            }
        }
    }

    // Whatever the amount, category, date and account scans did not claim
    // becomes the comment, in input order.
    let comment: String = tokens
        .iter()
        .enumerate()
        .filter(|(i, _)| {
            *i >= 1
                && !(cat_start..=cat_end).contains(i)
                && Some(*i) != date_idx
                && account_start.is_none_or(|s| *i < s)
        })
        .map(|(_, t)| *t)
        .collect::<Vec<_>>()
        .join(" ");

    Ok(FastExpense {
        amount,
        category,
        category_known,
        comment: (!comment.is_empty()).then_some(comment),
        date: date.unwrap_or(today),
        account,
    })
}

/// Recognises `DD.MM`, `DD/MM` and the same with a 2- or 4-digit year.
/// Out-of-range dates (e.g. `31.02`) are not a date at all.
fn parse_date_token(token: &str, today: NaiveDate) -> Option<NaiveDate> {
    let parts: Vec<&str> = token.split(['.', '/']).collect();
    if !(2..=3).contains(&parts.len()) {
        return None;
    }
    let day = parse_digits(parts[0], 1, 2)?;
    let month = parse_digits(parts[1], 1, 2)?;
    let year = match parts.get(2) {
        None => today.year(),
        Some(raw) => {
            let value = parse_digits(raw, 2, 4)? as i32;
            if raw.len() == 2 {
                today.year() / 100 * 100 + value
            } else {
                value
            }
        }
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_digits(raw: &str, min_len: usize, max_len: usize) -> Option<u32> {
    if raw.len() < min_len || raw.len() > max_len || !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 10).unwrap()
    }

    fn cats(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn amount_and_category_only() {
        let parsed = parse_fast_expense("500 еда", &cats(&["Еда"]), &[], today()).unwrap();
        assert_eq!(parsed.amount, MoneyCents::new(500_00));
        assert_eq!(parsed.category, "еда");
        assert!(parsed.category_known);
        assert_eq!(parsed.comment, None);
        assert_eq!(parsed.date, today());
        assert_eq!(parsed.account, None);
    }

    #[test]
    fn trailing_words_become_the_comment() {
        let parsed =
            parse_fast_expense("450 кафе обед с коллегой", &cats(&["Кафе"]), &[], today()).unwrap();
        assert_eq!(parsed.category, "кафе");
        assert_eq!(parsed.comment.as_deref(), Some("обед с коллегой"));
    }

    #[test]
    fn date_token_is_recognised_with_the_current_year() {
        let parsed =
            parse_fast_expense("1200 транспорт такси 04.10", &cats(&["Транспорт"]), &[], today())
                .unwrap();
        assert_eq!(parsed.comment.as_deref(), Some("такси"));
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2025, 10, 4).unwrap());
    }

    #[test]
    fn account_suffix_and_date_leave_the_comment_in_the_middle() {
        let parsed = parse_fast_expense(
            "300 продукты ужин дома 03.10 PKO",
            &cats(&["Продукты"]),
            &["PKO".to_string()],
            today(),
        )
        .unwrap();
        assert_eq!(parsed.comment.as_deref(), Some("ужин дома"));
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2025, 10, 3).unwrap());
        assert_eq!(parsed.account.as_deref(), Some("PKO"));
    }

    #[test]
    fn multiword_category_beats_its_prefix() {
        let parsed = parse_fast_expense(
            "100 кафе у дома кофе",
            &cats(&["Кафе", "Кафе у дома"]),
            &[],
            today(),
        )
        .unwrap();
        assert_eq!(parsed.category, "кафе у дома");
        assert!(parsed.category_known);
        assert_eq!(parsed.comment.as_deref(), Some("кофе"));
    }

    #[test]
    fn known_category_is_matched_anywhere_after_the_amount() {
        let parsed =
            parse_fast_expense("450 обед кафе", &cats(&["Кафе"]), &[], today()).unwrap();
        assert_eq!(parsed.category, "кафе");
        assert!(parsed.category_known);
        assert_eq!(parsed.comment.as_deref(), Some("обед"));
    }

    #[test]
    fn unknown_category_falls_back_to_the_second_token() {
        let parsed = parse_fast_expense("75 цветы маме", &cats(&["Еда"]), &[], today()).unwrap();
        assert_eq!(parsed.category, "цветы");
        assert!(!parsed.category_known);
        assert_eq!(parsed.comment.as_deref(), Some("маме"));
    }

    #[test]
    fn out_of_range_date_is_skipped_and_scan_continues_left() {
        let parsed = parse_fast_expense(
            "50 еда 05.10 31.02",
            &cats(&["Еда"]),
            &[],
            today(),
        )
        .unwrap();
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2025, 10, 5).unwrap());
        assert_eq!(parsed.comment.as_deref(), Some("31.02"));
    }

    #[test]
    fn two_digit_year_is_expanded() {
        let parsed =
            parse_fast_expense("10 еда 01.02.24", &cats(&["Еда"]), &[], today()).unwrap();
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    }

    #[test]
    fn comma_amount_is_accepted() {
        let parsed = parse_fast_expense("12,50 еда", &cats(&["Еда"]), &[], today()).unwrap();
        assert_eq!(parsed.amount, MoneyCents::new(12_50));
    }

    #[test]
    fn bad_amount_reports_the_token() {
        let err = parse_fast_expense("abc еда", &cats(&["Еда"]), &[], today()).unwrap_err();
        assert_eq!(err, ParseError::BadAmount("abc".to_string()));
    }

    #[test]
    fn single_token_is_too_short() {
        let err = parse_fast_expense("500", &cats(&["Еда"]), &[], today()).unwrap_err();
        assert_eq!(err, ParseError::TooFewTokens);
        assert_eq!(
            parse_fast_expense("   ", &cats(&["Еда"]), &[], today()).unwrap_err(),
            ParseError::Empty
        );
    }

    #[test]
    fn longest_account_match_wins() {
        let parsed = parse_fast_expense(
            "20 еда обед PKO сбережения",
            &cats(&["Еда"]),
            &["PKO".to_string(), "PKO сбережения".to_string()],
            today(),
        )
        .unwrap();
        assert_eq!(parsed.account.as_deref(), Some("PKO сбережения"));
        assert_eq!(parsed.comment.as_deref(), Some("обед"));
    }

    #[test]
    fn zero_amount_is_rejected() {
        let err = parse_fast_expense("0 еда", &cats(&["Еда"]), &[], today()).unwrap_err();
        assert_eq!(err, ParseError::BadAmount("0".to_string()));
    }
}
