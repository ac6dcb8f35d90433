//! Guided input steps. Each arm validates the incoming text; invalid input
//! re-prompts without touching the stored flow, so the same step runs again.

use teloxide::prelude::*;
use teloxide::types::{ParseMode, Recipient};
use tracing::error;

use crate::bot::keyboards;
use crate::dialogue::Flow;
use crate::services::promo_service::mask_id;
use crate::services::store_service::ClearOutcome;
use crate::state::AppState;

const TRX_CUSTOM_MIN: i64 = 15000;
const TRX_CUSTOM_MAX: i64 = 1000000;

pub async fn advance(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
    flow: Flow,
) -> Result<(), teloxide::RequestError> {
    let chat_id = msg.chat.id;

    // Forwarding accepts any message kind; everything else needs text.
    if let Flow::ForwardMessage = flow {
        return forward_to_everyone(bot, msg, state).await;
    }
    let Some(text) = msg.text() else {
        let _ = bot
            .send_message(chat_id, "Please send text.")
            .reply_markup(keyboards::cancel_keyboard())
            .await;
        return Ok(());
    };
    let text = text.trim();

    match flow {
        Flow::GiftRedeem => {
            let user_id = msg.from.as_ref().map(|u| u.id.0 as i64).unwrap_or(chat_id.0);
            match state.promo.redeem(user_id, text).await {
                Ok(Some(receipt)) => {
                    state.dialogues.clear(chat_id).await;
                    let _ = bot
                        .send_message(
                            chat_id,
                            format!(
                                "🎉 Gift code accepted!\n\n\
                                 💰 {} toman was added to your balance.\n\
                                 💳 New balance: *{}* toman",
                                receipt.amount, receipt.new_balance
                            ),
                        )
                        .parse_mode(ParseMode::Markdown)
                        .reply_markup(keyboards::main_menu())
                        .await;
                    let _ = bot
                        .send_message(
                            ChatId(state.cfg.admin_id),
                            format!(
                                "🎁 Gift code `{}` used by `{}` ({}/{} uses).",
                                text, user_id, receipt.used, receipt.total
                            ),
                        )
                        .parse_mode(ParseMode::Markdown)
                        .await;
                }
                Ok(None) => {
                    state.dialogues.clear(chat_id).await;
                    let _ = bot
                        .send_message(chat_id, "❌ This gift code is not valid.")
                        .reply_markup(keyboards::main_menu())
                        .await;
                }
                Err(e) => internal_error(bot, state, chat_id, e).await,
            }
        }

        Flow::AddCreditAmount => match parse_positive(text) {
            Some(amount) => {
                state
                    .dialogues
                    .set(chat_id, Flow::AddCreditTarget { amount })
                    .await;
                prompt(bot, chat_id, "Send the numeric user id:").await;
            }
            None => prompt(bot, chat_id, "Send a positive number for the amount:").await,
        },
        Flow::AddCreditTarget { amount } => match parse_user_id(text) {
            Some(target) => match state.credit.add_credit(target, amount).await {
                Ok(new_balance) => {
                    state.dialogues.clear(chat_id).await;
                    notify_or_report(
                        bot,
                        chat_id,
                        target,
                        &format!(
                            "💰 {} toman was added to your balance.\nNew balance: {} toman",
                            amount, new_balance
                        ),
                    )
                    .await;
                    let _ = bot
                        .send_message(
                            chat_id,
                            format!("✅ Added {} toman to `{}` (now {}).", amount, target, new_balance),
                        )
                        .parse_mode(ParseMode::Markdown)
                        .reply_markup(keyboards::admin_panel())
                        .await;
                }
                Err(e) => internal_error(bot, state, chat_id, e).await,
            },
            None => prompt(bot, chat_id, "Send the numeric user id:").await,
        },

        Flow::SubCreditAmount => match parse_positive(text) {
            Some(amount) => {
                state
                    .dialogues
                    .set(chat_id, Flow::SubCreditTarget { amount })
                    .await;
                prompt(bot, chat_id, "Send the numeric user id:").await;
            }
            None => prompt(bot, chat_id, "Send a positive number for the amount:").await,
        },
        Flow::SubCreditTarget { amount } => match parse_user_id(text) {
            Some(target) => match state.credit.subtract_credit(target, amount).await {
                Ok(new_balance) => {
                    state.dialogues.clear(chat_id).await;
                    notify_or_report(
                        bot,
                        chat_id,
                        target,
                        &format!(
                            "💸 {} toman was deducted from your balance.\nNew balance: {} toman",
                            amount, new_balance
                        ),
                    )
                    .await;
                    let _ = bot
                        .send_message(
                            chat_id,
                            format!(
                                "✅ Subtracted {} toman from `{}` (now {}).",
                                amount, target, new_balance
                            ),
                        )
                        .parse_mode(ParseMode::Markdown)
                        .reply_markup(keyboards::admin_panel())
                        .await;
                }
                Err(e) => internal_error(bot, state, chat_id, e).await,
            },
            None => prompt(bot, chat_id, "Send the numeric user id:").await,
        },

        Flow::BanTarget => match parse_user_id(text) {
            Some(target) => match state.admin.ban(target).await {
                Ok(()) => {
                    state.dialogues.clear(chat_id).await;
                    notify_or_report(bot, chat_id, target, "⛔️ You have been banned from this bot.")
                        .await;
                    let _ = bot
                        .send_message(chat_id, format!("✅ User {} is banned.", target))
                        .reply_markup(keyboards::admin_panel())
                        .await;
                }
                Err(e) => internal_error(bot, state, chat_id, e).await,
            },
            None => prompt(bot, chat_id, "Send the numeric user id:").await,
        },

        Flow::UnbanTarget => match parse_user_id(text) {
            Some(target) => match state.admin.unban(target).await {
                Ok(true) => {
                    state.dialogues.clear(chat_id).await;
                    notify_or_report(bot, chat_id, target, "✅ Your ban has been lifted.").await;
                    let _ = bot
                        .send_message(chat_id, format!("✅ User {} is unbanned.", target))
                        .reply_markup(keyboards::admin_panel())
                        .await;
                }
                Ok(false) => {
                    state.dialogues.clear(chat_id).await;
                    let _ = bot
                        .send_message(chat_id, format!("User {} is not banned.", target))
                        .reply_markup(keyboards::admin_panel())
                        .await;
                }
                Err(e) => internal_error(bot, state, chat_id, e).await,
            },
            None => prompt(bot, chat_id, "Send the numeric user id:").await,
        },

        Flow::DirectMessageTarget => match parse_user_id(text) {
            Some(target) => {
                state
                    .dialogues
                    .set(chat_id, Flow::DirectMessageText { target })
                    .await;
                prompt(bot, chat_id, "Send the message text:").await;
            }
            None => prompt(bot, chat_id, "Send the numeric user id:").await,
        },
        Flow::DirectMessageText { target } => {
            state.dialogues.clear(chat_id).await;
            match bot
                .send_message(ChatId(target), format!("✉️ Message from support:\n\n{}", text))
                .await
            {
                Ok(_) => {
                    let _ = bot
                        .send_message(chat_id, "✅ Message delivered.")
                        .reply_markup(keyboards::admin_panel())
                        .await;
                }
                Err(e) => {
                    let _ = bot
                        .send_message(chat_id, format!("❌ Could not deliver: {}", e))
                        .reply_markup(keyboards::admin_panel())
                        .await;
                }
            }
        }

        Flow::BalanceTarget => match parse_user_id(text) {
            Some(target) => {
                state.dialogues.clear(chat_id).await;
                let view = state.credit.account_view(target).await;
                let _ = bot
                    .send_message(
                        chat_id,
                        format!(
                            "👤 `{}`\n💳 Balance: {} toman\n💰 Charged: {} toman\n🛍 Purchased: {}",
                            view.user_id, view.balance, view.charged, view.purchased
                        ),
                    )
                    .parse_mode(ParseMode::Markdown)
                    .reply_markup(keyboards::admin_panel())
                    .await;
            }
            None => prompt(bot, chat_id, "Send the numeric user id:").await,
        },

        Flow::RecentPurchasesTarget => match parse_user_id(text) {
            Some(target) => {
                state.dialogues.clear(chat_id).await;
                let purchases = state.credit.purchases_last_week(target).await;
                let body = if purchases.is_empty() {
                    "No purchases in the last week.".to_string()
                } else {
                    purchases
                        .iter()
                        .map(|p| format!("▫️ {}", p))
                        .collect::<Vec<_>>()
                        .join("\n")
                };
                let _ = bot
                    .send_message(chat_id, format!("🧾 Purchases of {} (7 days):\n{}", target, body))
                    .reply_markup(keyboards::admin_panel())
                    .await;
            }
            None => prompt(bot, chat_id, "Send the numeric user id:").await,
        },

        Flow::SearchUserInput => match parse_user_id(text) {
            Some(target) => {
                state.dialogues.clear(chat_id).await;
                let view = state.stats.search_user(target).await;
                let _ = bot
                    .send_message(
                        chat_id,
                        format!(
                            "🔍 User `{}`\n\
                             💳 Balance: {} toman\n\
                             🛍 Purchased: {}\n\
                             🎁 Gift codes used: {}\n\
                             🧾 Last purchase: {}\n\
                             🎟 Last gift code: {}",
                            view.user_id,
                            view.balance,
                            view.purchased,
                            view.gift_usage,
                            view.last_purchase.unwrap_or_else(|| "-".into()),
                            view.last_gift_code.unwrap_or_else(|| "-".into()),
                        ),
                    )
                    .parse_mode(ParseMode::Markdown)
                    .reply_markup(keyboards::admin_panel())
                    .await;
            }
            None => prompt(bot, chat_id, "Send the numeric user id:").await,
        },

        Flow::BroadcastText => {
            state.dialogues.clear(chat_id).await;
            let ids = state.admin.registered_ids().await;
            let mut delivered = 0usize;
            for id in &ids {
                if bot.send_message(ChatId(*id), text).await.is_ok() {
                    delivered += 1;
                }
            }
            let _ = bot
                .send_message(
                    chat_id,
                    format!("📢 Broadcast delivered to {} of {} users.", delivered, ids.len()),
                )
                .reply_markup(keyboards::admin_panel())
                .await;
        }

        // Consumed before the text requirement above.
        Flow::ForwardMessage => {}

        Flow::AddCodesService => {
            if text.is_empty() {
                prompt(bot, chat_id, "Send the product name:").await;
            } else {
                state
                    .dialogues
                    .set(chat_id, Flow::AddCodesPath { service: text.to_string() })
                    .await;
                prompt(bot, chat_id, "Send the path of the code file:").await;
            }
        }
        Flow::AddCodesPath { service } => {
            match state.store.load_codes(&service, text).await {
                Ok(count) => {
                    state.dialogues.clear(chat_id).await;
                    let _ = bot
                        .send_message(
                            chat_id,
                            format!(
                                "✅ '{}' now reads codes from `{}`.\n📦 Codes loaded: {}",
                                service, text, count
                            ),
                        )
                        .parse_mode(ParseMode::Markdown)
                        .reply_markup(keyboards::admin_panel())
                        .await;
                }
                Err(e) => internal_error(bot, state, chat_id, e).await,
            }
        }

        // Every outcome ends the conversation; a wrong path is a failed
        // confirmation, not an invitation to retry.
        Flow::DeleteCodesConfirm { service } => {
            state.dialogues.clear(chat_id).await;
            let outcome = state.store.clear_codes(&service, text).await;
            let _ = bot
                .send_message(chat_id, delete_codes_reply(&outcome, &service))
                .reply_markup(keyboards::admin_panel())
                .await;
        }

        Flow::AddButtonName => {
            if text.is_empty() || text.len() > 50 {
                prompt(bot, chat_id, "Send a product name (max 50 characters):").await;
            } else {
                state
                    .dialogues
                    .set(chat_id, Flow::AddButtonPrice { name: text.to_string() })
                    .await;
                prompt(bot, chat_id, "Send the price in toman:").await;
            }
        }
        Flow::AddButtonPrice { name } => match parse_positive(text) {
            Some(price) => {
                state.store.add_product(&name, price).await;
                state.dialogues.clear(chat_id).await;
                let _ = bot
                    .send_message(
                        chat_id,
                        format!("✅ Product '{}' added at {} toman. Load its codes next.", name, price),
                    )
                    .reply_markup(keyboards::admin_panel())
                    .await;
            }
            None => prompt(bot, chat_id, "Send a positive number for the price:").await,
        },

        Flow::RenameButtonInput { original } => {
            if text.is_empty() {
                prompt(bot, chat_id, "Send the new product name:").await;
            } else {
                state.dialogues.clear(chat_id).await;
                let renamed = state.store.rename_product(&original, text).await;
                let reply = if renamed {
                    format!("✅ '{}' is now '{}'.", original, text)
                } else {
                    format!("❌ Product '{}' no longer exists.", original)
                };
                let _ = bot
                    .send_message(chat_id, reply)
                    .reply_markup(keyboards::admin_panel())
                    .await;
            }
        }

        Flow::PriceInput { product } => match parse_positive(text) {
            Some(price) => {
                state.dialogues.clear(chat_id).await;
                let updated = state.store.set_price(&product, price).await;
                let reply = if updated {
                    format!("✅ Price of '{}' set to {} toman.", product, price)
                } else {
                    format!("❌ Product '{}' no longer exists.", product)
                };
                let _ = bot
                    .send_message(chat_id, reply)
                    .reply_markup(keyboards::admin_panel())
                    .await;
            }
            None => prompt(bot, chat_id, "Send a positive number for the price:").await,
        },

        Flow::GiftManualAmount => match parse_positive(text) {
            Some(amount) => {
                state
                    .dialogues
                    .set(chat_id, Flow::GiftManualUsage { amount })
                    .await;
                prompt(bot, chat_id, "How many times can it be redeemed?").await;
            }
            None => prompt(bot, chat_id, "Send the gift amount in toman:").await,
        },
        Flow::GiftManualUsage { amount } => match text.parse::<u32>().ok().filter(|&n| n > 0) {
            Some(uses) => {
                let code = state.promo.create_code(amount, uses).await;
                state.dialogues.clear(chat_id).await;
                let _ = bot
                    .send_message(
                        chat_id,
                        format!(
                            "🎁 Gift code created:\n\n`{}`\n\n💰 {} toman, {} uses.",
                            code, amount, uses
                        ),
                    )
                    .parse_mode(ParseMode::Markdown)
                    .reply_markup(keyboards::admin_panel())
                    .await;
            }
            None => prompt(bot, chat_id, "Send a positive number of uses:").await,
        },

        Flow::GiftRandomCount => match text.parse::<usize>().ok().filter(|&n| n > 0) {
            Some(winners) => {
                state
                    .dialogues
                    .set(chat_id, Flow::GiftRandomAmount { winners })
                    .await;
                prompt(bot, chat_id, "Send the prize amount in toman:").await;
            }
            None => prompt(bot, chat_id, "Send a positive number of winners:").await,
        },
        Flow::GiftRandomAmount { winners } => match parse_positive(text) {
            Some(amount) => match state.promo.draw_winners(winners, amount).await {
                Ok(drawn) => {
                    state.dialogues.clear(chat_id).await;
                    for winner in &drawn {
                        let _ = bot
                            .send_message(
                                ChatId(winner.user_id),
                                format!("🎉 Congratulations! You won {} toman of credit!", amount),
                            )
                            .await;
                    }
                    if !state.cfg.announce_channel.is_empty() {
                        let mut lines =
                            vec![format!("🎉 {} toman prize went to:", amount)];
                        for winner in &drawn {
                            lines.push(format!("🏆 {}", mask_id(winner.user_id)));
                        }
                        let recipient =
                            Recipient::ChannelUsername(state.cfg.announce_channel.clone());
                        let _ = bot.send_message(recipient, lines.join("\n")).await;
                    }
                    let _ = bot
                        .send_message(
                            chat_id,
                            format!("✅ Credited {} winners with {} toman each.", drawn.len(), amount),
                        )
                        .reply_markup(keyboards::admin_panel())
                        .await;
                }
                Err(e) => internal_error(bot, state, chat_id, e).await,
            },
            None => prompt(bot, chat_id, "Send the prize amount in toman:").await,
        },

        Flow::TrxCustomAmount => match parse_positive(text) {
            Some(amount) if (TRX_CUSTOM_MIN..=TRX_CUSTOM_MAX).contains(&amount) => {
                state.dialogues.clear(chat_id).await;
                send_trx_invoice(bot, state, chat_id, amount).await;
            }
            _ => {
                prompt(
                    bot,
                    chat_id,
                    &format!(
                        "Send an amount between {} and {} toman:",
                        TRX_CUSTOM_MIN, TRX_CUSTOM_MAX
                    ),
                )
                .await;
            }
        },
    }

    Ok(())
}

/// Quotes the live price and shows the wallet plus the exact TRX to send.
pub async fn send_trx_invoice(bot: &Bot, state: &AppState, chat_id: ChatId, amount: i64) {
    match state.pay.latest_trx_price().await {
        Ok(price) => {
            let trx = crate::services::pay_service::PayService::trx_amount(amount as f64, price);
            let _ = bot
                .send_message(
                    chat_id,
                    format!(
                        "🔺 Top up {} toman with TRX\n\n\
                         Send exactly *{:.4} TRX* to:\n`{}`\n\n\
                         Then send a screenshot to support so your balance gets credited.",
                        amount, trx, state.cfg.trx_wallet
                    ),
                )
                .parse_mode(ParseMode::Markdown)
                .reply_markup(keyboards::inline_main_menu())
                .await;
        }
        Err(e) => {
            error!("TRX quote failed: {:#}", e);
            let _ = bot
                .send_message(
                    chat_id,
                    "⚠️ The price feed is unavailable right now. Try again in a few minutes.",
                )
                .reply_markup(keyboards::inline_main_menu())
                .await;
        }
    }
}

async fn forward_to_everyone(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
) -> Result<(), teloxide::RequestError> {
    let chat_id = msg.chat.id;
    state.dialogues.clear(chat_id).await;
    let ids = state.admin.registered_ids().await;
    let mut delivered = 0usize;
    for id in &ids {
        if bot.forward_message(ChatId(*id), chat_id, msg.id).await.is_ok() {
            delivered += 1;
        }
    }
    let _ = bot
        .send_message(
            chat_id,
            format!("↪️ Forwarded to {} of {} users.", delivered, ids.len()),
        )
        .reply_markup(keyboards::admin_panel())
        .await;
    Ok(())
}

fn parse_positive(text: &str) -> Option<i64> {
    text.parse::<i64>().ok().filter(|&n| n > 0)
}

fn parse_user_id(text: &str) -> Option<i64> {
    text.parse::<i64>().ok().filter(|&n| n > 0)
}

fn delete_codes_reply(outcome: &ClearOutcome, service: &str) -> String {
    match outcome {
        ClearOutcome::Cleared => format!("🗑 Codes of '{}' were deleted.", service),
        ClearOutcome::PathMismatch => {
            "❌ The path does not match the stored one. Nothing was deleted.".to_string()
        }
        ClearOutcome::UnknownProduct => "❌ That product no longer exists.".to_string(),
    }
}

/// Notifies the affected user; a delivery failure is reported back to the
/// admin chat instead of being swallowed.
async fn notify_or_report(bot: &Bot, admin_chat: ChatId, target: i64, text: &str) {
    if let Err(e) = bot.send_message(ChatId(target), text).await {
        let _ = bot
            .send_message(admin_chat, format!("⚠️ Could not notify {}: {}", target, e))
            .await;
    }
}

async fn prompt(bot: &Bot, chat_id: ChatId, text: &str) {
    let _ = bot
        .send_message(chat_id, text)
        .reply_markup(keyboards::cancel_keyboard())
        .await;
}

/// Reports a service failure to the admin chat and drops the flow.
async fn internal_error(bot: &Bot, state: &AppState, chat_id: ChatId, e: anyhow::Error) {
    error!("Flow step failed: {:#}", e);
    state.dialogues.clear(chat_id).await;
    let _ = bot
        .send_message(chat_id, "⚠️ Something went wrong. The operation was aborted.")
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_codes_mismatch_is_final_and_deletes_nothing() {
        let reply = delete_codes_reply(&ClearOutcome::PathMismatch, "snapp");
        assert!(reply.contains("Nothing was deleted"));
        // No retry prompt: the reply never asks to type the path again.
        assert!(!reply.to_lowercase().contains("type"));
    }

    #[test]
    fn delete_codes_replies_name_the_product_on_success() {
        let reply = delete_codes_reply(&ClearOutcome::Cleared, "snapp");
        assert!(reply.contains("snapp"));
        assert!(delete_codes_reply(&ClearOutcome::UnknownProduct, "snapp").contains("no longer"));
    }
}
