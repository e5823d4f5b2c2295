use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::NotificationConfig;
use crate::decimal::Money;
use crate::events::{Event, EventStore};

/// an outbound message; delivery is best-effort and never blocks or
/// fails the business operation that queued it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub attempts: u32,
}

impl Notification {
    pub fn new(recipient: &str, subject: &str, body: String) -> Self {
        Self {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body,
            attempts: 0,
        }
    }

    /// acknowledgement that a loan application was received
    pub fn loan_application_received(
        recipient: &str,
        full_name: &str,
        amount: Money,
        term_months: u32,
        total_repayment: Money,
    ) -> Self {
        Self::new(
            recipient,
            "Loan Application Received",
            format!(
                "Dear {},\n\nYour loan application has been received and is under review.\n\
                 Amount: KES {}\nTerm: {} months\nTotal Repayment: KES {}\n\n\
                 We will notify you once a loan officer reviews your application.",
                full_name, amount, term_months, total_repayment
            ),
        )
    }

    /// alert to the officers' desk that an application awaits review
    pub fn application_awaiting_review(officer_desk: &str, applicant: &str, amount: Money) -> Self {
        Self::new(
            officer_desk,
            "Loan Application Awaiting Review",
            format!(
                "A loan application from {} for KES {} is awaiting review.",
                applicant, amount
            ),
        )
    }

    /// outcome of an officer decision, with the officer's note
    pub fn loan_decision(recipient: &str, full_name: &str, approved: bool, note: &str) -> Self {
        let note = if note.is_empty() { "N/A" } else { note };
        if approved {
            Self::new(
                recipient,
                "Loan Application Approved",
                format!(
                    "Dear {},\n\nYour loan application has been approved. \
                     You can now view your loan and make payments from your dashboard.\n\n\
                     Officer's note: {}",
                    full_name, note
                ),
            )
        } else {
            Self::new(
                recipient,
                "Loan Application Update",
                format!(
                    "Dear {},\n\nWe regret to inform you that your loan application \
                     has been declined.\n\nOfficer's note: {}",
                    full_name, note
                ),
            )
        }
    }

    /// deposit receipt
    pub fn deposit_received(recipient: &str, full_name: &str, amount: Money) -> Self {
        Self::new(
            recipient,
            "Deposit Received",
            format!(
                "Dear {},\n\nYour deposit of KES {} has been received.\n\nThank you.",
                full_name, amount
            ),
        )
    }

    /// repayment receipt carrying the new balance
    pub fn payment_received(
        recipient: &str,
        full_name: &str,
        amount: Money,
        reference: &str,
        new_balance: Money,
    ) -> Self {
        Self::new(
            recipient,
            "Loan Payment Confirmation",
            format!(
                "Dear {},\n\nYour loan payment of KES {} has been processed.\n\
                 Reference: {}\nRemaining Balance: KES {}\n\nThank you for your payment.",
                full_name, amount, reference, new_balance
            ),
        )
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("transport failure: {0}")]
    Transport(String),
}

/// delivery transport; implementations wrap the actual email/SMS provider
pub trait NotificationSender: Send + Sync {
    fn send(&self, notification: &Notification) -> Result<(), SendError>;
}

/// test transport that records everything it is asked to send
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<Notification>>,
    failures_remaining: Mutex<u32>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// fail the next `n` sends before succeeding again
    pub fn fail_next(&self, n: u32) {
        *self.failures_remaining.lock().expect("lock poisoned") = n;
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("lock poisoned").clone()
    }
}

impl NotificationSender for RecordingSender {
    fn send(&self, notification: &Notification) -> Result<(), SendError> {
        let mut failures = self.failures_remaining.lock().expect("lock poisoned");
        if *failures > 0 {
            *failures -= 1;
            return Err(SendError::Transport("simulated outage".to_string()));
        }
        self.sent
            .lock()
            .expect("lock poisoned")
            .push(notification.clone());
        Ok(())
    }
}

/// outbound queue decoupled from the request path; enqueue never fails
/// the caller, drain retries and dead-letters exhausted messages
pub struct NotificationDispatcher {
    config: NotificationConfig,
    queue: Mutex<VecDeque<Notification>>,
    dead_letters: Mutex<Vec<Notification>>,
    events: Mutex<EventStore>,
}

impl NotificationDispatcher {
    pub fn new(config: NotificationConfig) -> Self {
        Self {
            config,
            queue: Mutex::new(VecDeque::new()),
            dead_letters: Mutex::new(Vec::new()),
            events: Mutex::new(EventStore::new()),
        }
    }

    /// queue a message for later delivery
    pub fn enqueue(&self, notification: Notification, time: &SafeTimeProvider) {
        debug!(
            recipient = %notification.recipient,
            subject = %notification.subject,
            "notification queued"
        );
        self.emit(Event::NotificationQueued {
            recipient: notification.recipient.clone(),
            subject: notification.subject.clone(),
            timestamp: time.now(),
        });
        self.queue
            .lock()
            .expect("lock poisoned")
            .push_back(notification);
    }

    /// attempt delivery of everything queued; failed messages are retried
    /// on the next drain until their attempt budget is exhausted, then
    /// moved to the dead letter list; returns the number delivered
    pub fn drain(&self, sender: &dyn NotificationSender, time: &SafeTimeProvider) -> usize {
        let mut delivered = 0;
        loop {
            let Some(mut notification) = self.queue.lock().expect("lock poisoned").pop_front()
            else {
                break;
            };

            notification.attempts += 1;
            match sender.send(&notification) {
                Ok(()) => {
                    delivered += 1;
                    self.emit(Event::NotificationDelivered {
                        recipient: notification.recipient.clone(),
                        subject: notification.subject.clone(),
                        timestamp: time.now(),
                    });
                }
                Err(err) => {
                    warn!(
                        recipient = %notification.recipient,
                        subject = %notification.subject,
                        attempts = notification.attempts,
                        error = %err,
                        "notification delivery failed"
                    );
                    let dead_lettered = notification.attempts >= self.config.max_attempts;
                    self.emit(Event::NotificationFailed {
                        recipient: notification.recipient.clone(),
                        subject: notification.subject.clone(),
                        attempts: notification.attempts,
                        dead_lettered,
                        timestamp: time.now(),
                    });
                    if dead_lettered {
                        self.dead_letters
                            .lock()
                            .expect("lock poisoned")
                            .push(notification);
                    } else {
                        // requeue at the back so one bad recipient cannot
                        // starve the rest of the queue
                        self.queue
                            .lock()
                            .expect("lock poisoned")
                            .push_back(notification);
                        // stop this drain pass; the transport is likely down
                        break;
                    }
                }
            }
        }
        delivered
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().expect("lock poisoned").len()
    }

    pub fn dead_letters(&self) -> Vec<Notification> {
        self.dead_letters.lock().expect("lock poisoned").clone()
    }

    /// drain the lifecycle events collected so far
    pub fn take_events(&self) -> Vec<Event> {
        self.events.lock().expect("lock poisoned").take_events()
    }

    fn emit(&self, event: Event) {
        self.events.lock().expect("lock poisoned").emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;

    fn dispatcher() -> NotificationDispatcher {
        NotificationDispatcher::new(NotificationConfig::default())
    }

    fn clock() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
        ))
    }

    #[test]
    fn test_drain_delivers_queued_messages() {
        let time = clock();
        let dispatcher = dispatcher();
        let sender = RecordingSender::new();

        dispatcher.enqueue(
            Notification::deposit_received("jane@example.com", "Jane", Money::from_major(5_000)),
            &time,
        );
        dispatcher.enqueue(
            Notification::deposit_received("john@example.com", "John", Money::from_major(2_000)),
            &time,
        );

        assert_eq!(dispatcher.drain(&sender, &time), 2);
        assert_eq!(sender.sent().len(), 2);
        assert_eq!(dispatcher.pending(), 0);
    }

    #[test]
    fn test_failed_delivery_is_retried_then_dead_lettered() {
        let time = clock();
        let dispatcher = dispatcher();
        let sender = RecordingSender::new();
        sender.fail_next(10);

        dispatcher.enqueue(
            Notification::deposit_received("jane@example.com", "Jane", Money::from_major(5_000)),
            &time,
        );

        // three drain passes exhaust the attempt budget
        assert_eq!(dispatcher.drain(&sender, &time), 0);
        assert_eq!(dispatcher.pending(), 1);
        assert_eq!(dispatcher.drain(&sender, &time), 0);
        assert_eq!(dispatcher.drain(&sender, &time), 0);

        assert_eq!(dispatcher.pending(), 0);
        let dead = dispatcher.dead_letters();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].attempts, 3);
    }

    #[test]
    fn test_recovered_transport_delivers_requeued_message() {
        let time = clock();
        let dispatcher = dispatcher();
        let sender = RecordingSender::new();
        sender.fail_next(1);

        dispatcher.enqueue(
            Notification::deposit_received("jane@example.com", "Jane", Money::from_major(5_000)),
            &time,
        );

        assert_eq!(dispatcher.drain(&sender, &time), 0);
        assert_eq!(dispatcher.drain(&sender, &time), 1);
        assert!(dispatcher.dead_letters().is_empty());
    }

    #[test]
    fn test_lifecycle_events_track_queue_and_delivery() {
        let time = clock();
        let dispatcher = dispatcher();
        let sender = RecordingSender::new();

        dispatcher.enqueue(
            Notification::deposit_received("jane@example.com", "Jane", Money::from_major(5_000)),
            &time,
        );
        dispatcher.drain(&sender, &time);

        let events = dispatcher.take_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::NotificationQueued { recipient, .. } if recipient == "jane@example.com")));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::NotificationDelivered { .. })));

        // take drains the store
        assert!(dispatcher.take_events().is_empty());
    }

    #[test]
    fn test_drained_failure_emits_failure_event() {
        let time = clock();
        let dispatcher = dispatcher();
        let sender = RecordingSender::new();
        sender.fail_next(10);

        dispatcher.enqueue(
            Notification::deposit_received("jane@example.com", "Jane", Money::from_major(5_000)),
            &time,
        );

        dispatcher.drain(&sender, &time);
        let events = dispatcher.take_events();
        assert!(events.iter().any(|e| matches!(
            e,
            Event::NotificationFailed {
                attempts: 1,
                dead_lettered: false,
                ..
            }
        )));

        // exhaust the budget; the final failure is flagged as dead-lettered
        dispatcher.drain(&sender, &time);
        dispatcher.drain(&sender, &time);
        let events = dispatcher.take_events();
        assert!(events.iter().any(|e| matches!(
            e,
            Event::NotificationFailed {
                attempts: 3,
                dead_lettered: true,
                ..
            }
        )));
    }
}
