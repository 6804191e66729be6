//! Save-completion notifications
//!
//! Editors publish here after a successful save so list views can refresh
//! without holding a reference to the editor.

use serde::Serialize;
use tabula_core::record::Record;
use tabula_core::{Channel, SubscriptionId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveNotice {
    pub table: String,
    pub record: Record,
}

#[derive(Debug)]
pub struct SaveNotifier {
    channel: Channel<SaveNotice>,
}

impl Default for SaveNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SaveNotifier {
    pub fn new() -> Self {
        Self {
            channel: Channel::new("record_saved"),
        }
    }

    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&SaveNotice) + Send + Sync + 'static,
    {
        self.channel.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.channel.unsubscribe(id)
    }

    pub fn notify(&self, notice: &SaveNotice) {
        tracing::debug!(table = %notice.table, "record saved");
        self.channel.publish(notice);
    }

    pub fn subscriber_count(&self) -> usize {
        self.channel.subscriber_count()
    }
}
