use std::collections::BTreeMap;
use std::future::Future;

use dday_db::{ContractRow, DueReminderRow};
use dday_push::{PushError, PushMessage, PushSession};

/// Delivers one message to one device token.
///
/// Implemented by [`PushSession`] in production; tests substitute a recorder.
pub trait Notifier: Sync {
    fn notify(
        &self,
        device_token: &str,
        message: &PushMessage,
    ) -> impl Future<Output = Result<(), PushError>> + Send;
}

impl Notifier for PushSession {
    async fn notify(&self, device_token: &str, message: &PushMessage) -> Result<(), PushError> {
        let name = self.send(device_token, message).await?;
        tracing::trace!(message_name = %name, "push accepted");
        Ok(())
    }
}

/// Builds the notification for a reminder of `contract`.
#[must_use]
pub fn build_push_message(reminder: &DueReminderRow, contract: &ContractRow) -> PushMessage {
    let notice = dday_core::reminder_notice(&contract.title, reminder.days_before);
    let data = BTreeMap::from([
        ("reminder_id".to_string(), reminder.id.to_string()),
        ("contract_id".to_string(), contract.id.to_string()),
        ("days_before".to_string(), reminder.days_before.to_string()),
        ("url".to_string(), format!("/contracts/{}", contract.id)),
    ]);

    PushMessage {
        title: notice.title,
        body: notice.body,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    #[test]
    fn message_carries_contract_and_reminder_ids() {
        let contract = ContractRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Netflix".to_string(),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 11).unwrap(),
        };
        let reminder = DueReminderRow {
            id: Uuid::new_v4(),
            contract_id: contract.id,
            days_before: 1,
            scheduled_date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
        };

        let message = build_push_message(&reminder, &contract);
        assert!(message.body.contains("Netflix"));
        assert!(message.body.contains("내일"));
        assert_eq!(message.data["reminder_id"], reminder.id.to_string());
        assert_eq!(message.data["days_before"], "1");
        assert_eq!(message.data["url"], format!("/contracts/{}", contract.id));
    }
}
