use std::sync::Arc;

use ledger::{
    CategoryKind, InMemoryAccounts, InMemoryCategories, InMemoryTransactions, InMemoryUsers,
};

mod settings;

const EXPENSE_CATEGORIES: &[&str] = &[
    "Еда",
    "Кафе",
    "Транспорт",
    "Продукты",
    "Жильё",
    "Здоровье",
    "Развлечения",
    "Одежда",
];

const INCOME_CATEGORIES: &[&str] = &["Зарплата", "Подарок", "Проценты"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "kopilka={level},telegram_bot={level},ledger={level}",
            level = settings.app.level
        ))
        .init();

    if let Some(telegram) = settings.telegram {
        tasks.spawn(async move {
            tracing::info!("Found telegram settings...");
            let mut builder = telegram_bot::Bot::builder()
                .token(&telegram.token)
                .allowed_users(telegram.allowed_users.unwrap_or_default())
                .services(build_services());
            if let Some(hours) = telegram.session_ttl_hours {
                builder = builder.session_ttl_hours(hours);
            }
            if let Some(path) = telegram.state_path {
                builder = builder.state_path(path);
            }
            match builder.build() {
                Ok(bot) => bot.run().await,
                Err(err) => tracing::error!("failed to initialize telegram bot: {err}"),
            }
        });
    }

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

fn build_services() -> telegram_bot::Services {
    let users = Arc::new(InMemoryUsers::new());
    let categories = Arc::new(InMemoryCategories::new());
    for name in EXPENSE_CATEGORIES {
        categories.seed(name, CategoryKind::Expense);
    }
    for name in INCOME_CATEGORIES {
        categories.seed(name, CategoryKind::Income);
    }
    let accounts = Arc::new(InMemoryAccounts::new(users.clone()));
    let transactions = Arc::new(InMemoryTransactions::new(categories.clone()));

    telegram_bot::Services {
        users,
        categories,
        accounts,
        transactions,
    }
}
