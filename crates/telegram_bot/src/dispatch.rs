//! Ordered wizard dispatch.

use ledger::LedgerError;

use crate::{ui::Reply, update::BotUpdate};

/// One conversational flow. `supports` decides whether the update belongs to
/// this wizard; `handle` advances the flow and may produce a reply.
///
/// Returning `Ok(None)` claims the update without replying, which stops the
/// scan. Errors are logged by the dispatcher and the scan moves on.
pub trait Wizard: Send + Sync {
    fn name(&self) -> &'static str;

    fn supports(&self, update: &BotUpdate) -> bool;

    fn handle(&self, chat_id: i64, text: &str) -> Result<Option<Reply>, LedgerError>;
}

pub struct Dispatcher {
    wizards: Vec<Box<dyn Wizard>>,
}

impl Dispatcher {
    pub fn new(wizards: Vec<Box<dyn Wizard>>) -> Self {
        Self { wizards }
    }

    /// Offers the update to each wizard in registration order.
    ///
    /// The first wizard whose `supports` returns `true` gets the update. If
    /// it fails, the failure is logged and the remaining wizards are tried,
    /// so one broken flow cannot take the whole bot down.
    pub fn process(&self, update: &BotUpdate) -> Option<Reply> {
        for wizard in &self.wizards {
            if !wizard.supports(update) {
                continue;
            }
            match wizard.handle(update.chat_id, &update.text) {
                Ok(reply) => return reply,
                Err(err) => {
                    tracing::error!(wizard = wizard.name(), error = %err, "wizard failed");
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub {
        name: &'static str,
        accepts: bool,
        outcome: fn(i64) -> Result<Option<Reply>, LedgerError>,
    }

    impl Wizard for Stub {
        fn name(&self) -> &'static str {
            self.name
        }

        fn supports(&self, _update: &BotUpdate) -> bool {
            self.accepts
        }

        fn handle(&self, chat_id: i64, _text: &str) -> Result<Option<Reply>, LedgerError> {
            (self.outcome)(chat_id)
        }
    }

    fn update() -> BotUpdate {
        BotUpdate::new(1, "hello", None)
    }

    #[test]
    fn first_supporting_wizard_wins() {
        let dispatcher = Dispatcher::new(vec![
            Box::new(Stub {
                name: "skipped",
                accepts: false,
                outcome: |c| Ok(Some(Reply::text(c, "skipped"))),
            }),
            Box::new(Stub {
                name: "first",
                accepts: true,
                outcome: |c| Ok(Some(Reply::text(c, "first"))),
            }),
            Box::new(Stub {
                name: "second",
                accepts: true,
                outcome: |c| Ok(Some(Reply::text(c, "second"))),
            }),
        ]);

        let reply = dispatcher.process(&update()).unwrap();
        assert_eq!(reply.text, "first");
    }

    #[test]
    fn failing_wizard_falls_through_to_the_next() {
        let dispatcher = Dispatcher::new(vec![
            Box::new(Stub {
                name: "broken",
                accepts: true,
                outcome: |_| Err(LedgerError::InvalidInput("boom".into())),
            }),
            Box::new(Stub {
                name: "backup",
                accepts: true,
                outcome: |c| Ok(Some(Reply::text(c, "backup"))),
            }),
        ]);

        let reply = dispatcher.process(&update()).unwrap();
        assert_eq!(reply.text, "backup");
    }

    #[test]
    fn silent_claim_stops_the_scan() {
        let dispatcher = Dispatcher::new(vec![
            Box::new(Stub {
                name: "silent",
                accepts: true,
                outcome: |_| Ok(None),
            }),
            Box::new(Stub {
                name: "never",
                accepts: true,
                outcome: |c| Ok(Some(Reply::text(c, "never"))),
            }),
        ]);

        assert!(dispatcher.process(&update()).is_none());
    }

    #[test]
    fn no_supporting_wizard_yields_none() {
        let dispatcher = Dispatcher::new(vec![Box::new(Stub {
            name: "off",
            accepts: false,
            outcome: |c| Ok(Some(Reply::text(c, "off"))),
        })]);

        assert!(dispatcher.process(&update()).is_none());
    }
}
