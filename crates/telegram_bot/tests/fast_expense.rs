use std::sync::Arc;

use chrono::Datelike;
use ledger::{
    AccountKind, AccountService, CategoryKind, InMemoryAccounts, InMemoryCategories,
    InMemoryTransactions, InMemoryUsers, MoneyCents, TransactionService,
};
use telegram_bot::{
    Services,
    orchestrator::Orchestrator,
    session::{DialogState, SessionStore},
    update::{BotUpdate, UserRef},
    ui::{Keyboard, ParseMode, Reply},
};

fn services() -> Services {
    let users = Arc::new(InMemoryUsers::new());
    let categories = Arc::new(InMemoryCategories::new());
    categories.seed("Еда", CategoryKind::Expense);
    categories.seed("Продукты", CategoryKind::Expense);
    let accounts = Arc::new(InMemoryAccounts::new(users.clone()));
    let transactions = Arc::new(InMemoryTransactions::new(categories.clone()));
    Services {
        users,
        categories,
        accounts,
        transactions,
    }
}

fn harness() -> (Orchestrator, SessionStore, Services) {
    let services = services();
    let sessions = SessionStore::new();
    let orchestrator = Orchestrator::standard(&services, sessions.clone());
    (orchestrator, sessions, services)
}

fn send(orchestrator: &Orchestrator, chat_id: i64, text: &str) -> Reply {
    let update = BotUpdate::new(
        chat_id,
        text,
        Some(UserRef {
            username: None,
            first_name: "Боб".to_string(),
            last_name: Some("Б.".to_string()),
        }),
    );
    orchestrator.handle_update(&update).unwrap()
}

fn today() -> chrono::NaiveDate {
    chrono::Utc::now()
        .with_timezone(&chrono_tz::Europe::Warsaw)
        .date_naive()
}

#[test]
fn single_line_records_the_expense() {
    let (orchestrator, sessions, services) = harness();
    let chat = 1;

    let reply = send(&orchestrator, chat, "Быстрая запись расхода");
    assert_eq!(reply.parse_mode, Some(ParseMode::Html));
    assert!(reply.text.contains("одной строкой"));

    let reply = send(&orchestrator, chat, "500 еда");
    assert!(reply.text.contains("✅ Расход записан"));
    assert!(reply.text.contains("Еда"));
    // The date is echoed even when it defaults to today.
    let now = today();
    assert!(reply.text.contains(&format!("({:02}.{:02})", now.day(), now.month())));

    let date = today();
    let recorded = services
        .transactions
        .list_by_period(chat, date, date)
        .unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].amount, MoneyCents::new(500_00));

    // Ready for the next line right away.
    assert_eq!(
        sessions.get(chat).unwrap().state,
        DialogState::AwaitingFastExpense
    );
    let reply = send(&orchestrator, chat, "120 еда кофе");
    assert!(reply.text.contains("✅ Расход записан"));
}

#[test]
fn comment_date_and_account_are_picked_apart() {
    let (orchestrator, _, services) = harness();
    let chat = 1;
    send(&orchestrator, chat, "Быстрая запись расхода");
    services
        .accounts
        .create(chat, "PKO", AccountKind::Card, "PLN")
        .unwrap();

    let reply = send(&orchestrator, chat, "300 продукты ужин дома 03.10 PKO");
    assert!(reply.text.contains("✅ Расход записан"));
    assert!(reply.text.contains("ужин дома"));
    assert!(reply.text.contains("PKO"));

    let date = chrono::NaiveDate::from_ymd_opt(today().year(), 10, 3).unwrap();
    let recorded = services
        .transactions
        .list_by_period(chat, date, date)
        .unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].comment.as_deref(), Some("ужин дома"));
}

#[test]
fn unknown_category_offers_similar_ones() {
    let (orchestrator, sessions, services) = harness();
    let chat = 1;
    send(&orchestrator, chat, "Быстрая запись расхода");

    let reply = send(&orchestrator, chat, "300 прод ужин");
    assert!(reply.text.contains("Категория не найдена"));
    assert!(matches!(reply.keyboard, Some(Keyboard::Inline(_))));
    assert_eq!(
        sessions.get(chat).unwrap().state,
        DialogState::AwaitingCategoryClarification
    );

    let reply = send(&orchestrator, chat, "category:Продукты");
    assert!(reply.text.contains("✅ Расход записан"));
    assert!(reply.text.contains("Продукты"));
    assert!(reply.text.contains("ужин"));

    let date = today();
    let recorded = services
        .transactions
        .list_by_period(chat, date, date)
        .unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].amount, MoneyCents::new(300_00));
}

#[test]
fn hopeless_category_asks_to_retype() {
    let (orchestrator, sessions, _) = harness();
    let chat = 1;
    send(&orchestrator, chat, "Быстрая запись расхода");

    let reply = send(&orchestrator, chat, "100 xyz");
    assert!(reply.text.contains("Категория не найдена"));
    assert!(reply.text.contains("повторите ввод"));
    assert!(reply.keyboard.is_none());
    assert_eq!(
        sessions.get(chat).unwrap().state,
        DialogState::AwaitingFastExpense
    );
}

#[test]
fn parse_errors_are_reported_inline() {
    let (orchestrator, sessions, _) = harness();
    let chat = 1;
    send(&orchestrator, chat, "Быстрая запись расхода");

    let reply = send(&orchestrator, chat, "500");
    assert!(reply.text.contains("Не смог разобрать"));
    assert!(reply.text.contains("минимум два слова"));

    let reply = send(&orchestrator, chat, "abc еда");
    assert!(reply.text.contains("Некорректная сумма: 'abc'"));
    assert_eq!(
        sessions.get(chat).unwrap().state,
        DialogState::AwaitingFastExpense
    );
}

#[test]
fn cancel_leaves_fast_entry() {
    let (orchestrator, sessions, _) = harness();
    let chat = 1;
    send(&orchestrator, chat, "Быстрая запись расхода");

    let reply = send(&orchestrator, chat, "/cancel");
    assert!(reply.text.contains("Операция отменена"));
    assert!(sessions.get(chat).is_none());

    // Back to the orchestrator fallback for the next message.
    let reply = send(&orchestrator, chat, "500 еда");
    assert!(reply.text.contains("не понимаю"));
}
