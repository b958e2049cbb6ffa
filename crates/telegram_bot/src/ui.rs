//! Reply model and keyboard rendering.
//!
//! Everything here is transport-agnostic: a [`Keyboard`] is a plain grid of
//! labels and payload strings, converted to the wire types only in `handlers`.

use chrono::{Datelike, Days, Months, NaiveDate};
use ledger::{Account, Category, MoneyCents};

pub const RECORD_EXPENSE_LABEL: &str = "Записать расход";
pub const RECORD_INCOME_LABEL: &str = "Записать доход";
pub const STATISTICS_LABEL: &str = "Статистика";
pub const FAST_EXPENSE_LABEL: &str = "Быстрая запись расхода";

pub const CATEGORY_PAGE_SIZE: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseMode {
    Html,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub payload: String,
}

impl Button {
    pub fn new(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Keyboard {
    /// Buttons attached to the message, each carrying a callback payload.
    Inline(Vec<Vec<Button>>),
    /// Persistent menu shown under the input field.
    Menu(Vec<Vec<String>>),
}

/// One outbound message.
#[derive(Clone, Debug)]
pub struct Reply {
    pub chat_id: i64,
    pub text: String,
    pub parse_mode: Option<ParseMode>,
    pub keyboard: Option<Keyboard>,
}

impl Reply {
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            parse_mode: None,
            keyboard: None,
        }
    }

    #[must_use]
    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    #[must_use]
    pub fn html(mut self) -> Self {
        self.parse_mode = Some(ParseMode::Html);
        self
    }
}

/// Top-level menu, two actions per row.
pub fn main_menu() -> Keyboard {
    Keyboard::Menu(vec![
        vec![
            RECORD_EXPENSE_LABEL.to_string(),
            RECORD_INCOME_LABEL.to_string(),
        ],
        vec![STATISTICS_LABEL.to_string(), FAST_EXPENSE_LABEL.to_string()],
    ])
}

/// One page of category buttons plus prev/next navigation.
pub fn category_keyboard(page: usize, page_size: usize, categories: &[Category]) -> Keyboard {
    let mut rows: Vec<Vec<Button>> = Vec::new();
    let total_pages = categories.len().div_ceil(page_size.max(1));
    let start = page.saturating_mul(page_size);
    let end = usize::min(start.saturating_add(page_size), categories.len());

    for category in categories.get(start..end).unwrap_or(&[]) {
        rows.push(vec![Button::new(
            &category.name,
            format!("category:{}", category.name),
        )]);
    }

    let mut nav: Vec<Button> = Vec::new();
    if page > 0 {
        nav.push(Button::new("⬅️ Назад", format!("category_page:{}", page - 1)));
    }
    if page + 1 < total_pages {
        nav.push(Button::new(
            "Вперёд ➡️",
            format!("category_page:{}", page + 1),
        ));
    }
    if !nav.is_empty() {
        rows.push(nav);
    }

    Keyboard::Inline(rows)
}

/// Combined account + date summary: three rows (account, date, proceed).
pub fn account_date_keyboard(
    account: &Account,
    selected: Option<NaiveDate>,
    today: NaiveDate,
) -> Keyboard {
    let date = selected.unwrap_or(today);
    Keyboard::Inline(vec![
        vec![Button::new(
            format!("Счёт: {}", account.display_name()),
            "account:choose",
        )],
        vec![Button::new(format!("Дата: {date}"), "date:choose")],
        vec![Button::new(
            "Продолжить",
            format!("proceed_account_date:{}:{date}", account.id),
        )],
    ])
}

/// One account per row, taps come back as `account:<id>`.
pub fn account_picker(accounts: &[Account]) -> Keyboard {
    Keyboard::Inline(
        accounts
            .iter()
            .map(|a| vec![Button::new(a.display_name(), format!("account:{}", a.id))])
            .collect(),
    )
}

pub fn confirmation_keyboard() -> Keyboard {
    Keyboard::Inline(vec![
        vec![Button::new("Подтвердить", "confirm")],
        vec![Button::new("Отменить", "cancel")],
    ])
}

pub fn skip_description_keyboard() -> Keyboard {
    Keyboard::Inline(vec![vec![Button::new("Продолжить", "skip_description")]])
}

pub fn period_keyboard() -> Keyboard {
    Keyboard::Inline(vec![vec![
        Button::new("Сегодня", "stats_period:today"),
        Button::new("Этот месяц", "stats_period:month"),
        Button::new("Прошлый месяц", "stats_period:last_month"),
        Button::new("Этот год", "stats_period:year"),
        Button::new("Прошлый год", "stats_period:last_year"),
    ]])
}

/// Month grid, Monday first. Day taps carry `date:<iso>`, the header arrows
/// carry `date_prev:`/`date_next:` with the displayed `YYYY-MM`.
pub fn calendar(month: NaiveDate, selected: Option<NaiveDate>, today: NaiveDate) -> Keyboard {
    let first = month.with_day(1).unwrap_or(month);
    let shift = first.weekday().num_days_from_monday() as usize;
    let length = month_length(first);
    let year_month = format!("{:04}-{:02}", first.year(), first.month());

    let mut rows: Vec<Vec<Button>> = Vec::new();

    rows.push(vec![
        Button::new("◀", format!("date_prev:{year_month}")),
        Button::new(
            format!("{} {}", month_name(first.month()), first.year()),
            "noop",
        ),
        Button::new("▶", format!("date_next:{year_month}")),
    ]);

    rows.push(
        ["Пн", "Вт", "Ср", "Чт", "Пт", "Сб", "Вс"]
            .iter()
            .map(|d| Button::new(*d, "noop"))
            .collect(),
    );

    let mut week: Vec<Button> = Vec::new();
    for _ in 0..shift {
        week.push(Button::new(" ", "noop"));
    }
    for day in 1..=length {
        let Some(current) = first.with_day(day) else {
            continue;
        };
        let label = if selected == Some(current) {
            format!("▪{day}▪")
        } else {
            day.to_string()
        };
        week.push(Button::new(label, format!("date:{current}")));
        if week.len() == 7 {
            rows.push(std::mem::take(&mut week));
        }
    }
    if !week.is_empty() {
        while week.len() < 7 {
            week.push(Button::new(" ", "noop"));
        }
        rows.push(week);
    }

    rows.push(vec![Button::new("Сегодня", format!("date:{today}"))]);
    rows.push(vec![Button::new(
        "Выбрать",
        format!("date:accept:{}", selected.unwrap_or(today)),
    )]);

    Keyboard::Inline(rows)
}

/// Re-renders the calendar for a grid tap or a month-arrow tap.
///
/// A day tap (`date:<iso>`) redraws that day's month with the day
/// highlighted; an arrow tap shifts the named month by one.
pub fn calendar_navigation(payload: &str, today: NaiveDate) -> Keyboard {
    let selected = extract_selected(payload);
    let base = selected.unwrap_or(today);
    let base = if payload.starts_with("date_prev:") {
        base.checked_sub_months(Months::new(1)).unwrap_or(base)
    } else if payload.starts_with("date_next:") {
        base.checked_add_months(Months::new(1)).unwrap_or(base)
    } else {
        base
    };
    calendar(base, selected, today)
}

fn extract_selected(payload: &str) -> Option<NaiveDate> {
    if let Some(rest) = payload.strip_prefix("date:") {
        return rest.parse().ok();
    }
    if let Some(rest) = payload
        .strip_prefix("date_prev:")
        .or_else(|| payload.strip_prefix("date_next:"))
    {
        return format!("{rest}-01").parse().ok();
    }
    None
}

fn month_length(first: NaiveDate) -> u32 {
    first
        .checked_add_months(Months::new(1))
        .and_then(|d| d.checked_sub_days(Days::new(1)))
        .map_or(28, |d| d.day())
}

pub(crate) fn month_name(month: u32) -> &'static str {
    const RU: [&str; 12] = [
        "Январь",
        "Февраль",
        "Март",
        "Апрель",
        "Май",
        "Июнь",
        "Июль",
        "Август",
        "Сентябрь",
        "Октябрь",
        "Ноябрь",
        "Декабрь",
    ];
    month
        .checked_sub(1)
        .and_then(|i| RU.get(i as usize))
        .copied()
        .unwrap_or("")
}

/// Whole amounts print without the fractional part, the way people type them.
pub(crate) fn fmt_amount(amount: MoneyCents) -> String {
    if amount.cents() % 100 == 0 {
        (amount.cents() / 100).to_string()
    } else {
        amount.to_string()
    }
}

pub(crate) fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
