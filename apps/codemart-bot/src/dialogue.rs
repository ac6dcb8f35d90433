use std::collections::HashMap;
use std::sync::Arc;

use teloxide::types::ChatId;
use tokio::sync::Mutex;

/// Current step of a guided input flow, one per chat. Scratch data collected
/// in earlier steps rides along in the variant, so cancelling a flow drops
/// the scratchpad with the state.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    GiftRedeem,

    AddCreditAmount,
    AddCreditTarget { amount: i64 },
    SubCreditAmount,
    SubCreditTarget { amount: i64 },

    BanTarget,
    UnbanTarget,

    DirectMessageTarget,
    DirectMessageText { target: i64 },
    BalanceTarget,
    RecentPurchasesTarget,
    SearchUserInput,

    BroadcastText,
    ForwardMessage,

    AddCodesService,
    AddCodesPath { service: String },
    DeleteCodesConfirm { service: String },

    AddButtonName,
    AddButtonPrice { name: String },
    RenameButtonInput { original: String },
    PriceInput { product: String },

    GiftManualAmount,
    GiftManualUsage { amount: i64 },
    GiftRandomCount,
    GiftRandomAmount { winners: usize },

    TrxCustomAmount,
}

/// One active flow per chat. Entries are cleared on completion and on
/// cancel; a validation failure leaves the entry untouched so the same step
/// re-prompts.
#[derive(Clone, Default)]
pub struct DialogueStore {
    inner: Arc<Mutex<HashMap<ChatId, Flow>>>,
}

impl DialogueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, chat: ChatId) -> Option<Flow> {
        self.inner.lock().await.get(&chat).cloned()
    }

    pub async fn set(&self, chat: ChatId, flow: Flow) {
        self.inner.lock().await.insert(chat, flow);
    }

    pub async fn clear(&self, chat: ChatId) {
        self.inner.lock().await.remove(&chat);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_clear_cycle() {
        let store = DialogueStore::new();
        let chat = ChatId(1);
        assert_eq!(store.get(chat).await, None);

        store.set(chat, Flow::AddCreditAmount).await;
        assert_eq!(store.get(chat).await, Some(Flow::AddCreditAmount));

        store.set(chat, Flow::AddCreditTarget { amount: 500 }).await;
        assert_eq!(
            store.get(chat).await,
            Some(Flow::AddCreditTarget { amount: 500 })
        );

        store.clear(chat).await;
        assert_eq!(store.get(chat).await, None);
    }

    #[tokio::test]
    async fn chats_do_not_share_state() {
        let store = DialogueStore::new();
        store.set(ChatId(1), Flow::BanTarget).await;
        assert_eq!(store.get(ChatId(2)).await, None);
    }
}
