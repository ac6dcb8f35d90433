use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, InputFile, MessageId, ParseMode,
};
use tracing::{error, info, warn};

use crate::bot::callback_data::{AdminAction, CallbackAction};
use crate::bot::handlers::flows;
use crate::bot::keyboards;
use crate::bot::utils;
use crate::dialogue::Flow;
use crate::services::store_service::PurchaseOutcome;
use crate::state::AppState;

pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    state: AppState,
) -> Result<(), teloxide::RequestError> {
    info!("Received callback: {:?}", q.data);
    let callback_id = q.id.clone();
    let user_id = q.from.id.0 as i64;
    let origin = q.message.as_ref().map(|m| (m.chat().id, m.id()));
    let chat_id = origin.map(|(c, _)| c).unwrap_or(ChatId(user_id));

    let Some(data) = q.data else {
        let _ = bot.answer_callback_query(callback_id).await;
        return Ok(());
    };
    let Some(action) = CallbackAction::parse(&data) else {
        warn!("Unknown callback payload: {}", data);
        let _ = bot.answer_callback_query(callback_id).await;
        return Ok(());
    };
    let _ = bot.answer_callback_query(callback_id).await;

    if requires_admin(&action) && !state.is_admin(user_id) {
        edit(&bot, origin, "⛔️ You do not have access to this section.", None).await;
        return Ok(());
    }

    match action {
        CallbackAction::MainMenu => {
            state.dialogues.clear(chat_id).await;
            if let Some((chat, id)) = origin {
                let _ = bot.delete_message(chat, id).await;
            }
            let _ = bot
                .send_message(chat_id, "🏠 Main menu:")
                .reply_markup(keyboards::main_menu())
                .await;
        }

        CallbackAction::ConfirmMembership => {
            match utils::missing_membership(&bot, &state.cfg.required_channels, user_id).await {
                None => {
                    if let Some((chat, id)) = origin {
                        let _ = bot.delete_message(chat, id).await;
                    }
                    let _ = bot
                        .send_message(
                            chat_id,
                            "✅ Membership confirmed. Welcome to the discount-code store!",
                        )
                        .reply_markup(keyboards::main_menu())
                        .await;
                }
                Some(channel) => {
                    let _ = bot
                        .send_message(chat_id, format!("⛔️ You still have not joined {}.", channel))
                        .await;
                }
            }
        }

        CallbackAction::Buy(product) => {
            if user_blocked(&state, user_id).await {
                edit(&bot, origin, "⛔️ You cannot use the store right now.", None).await;
                return Ok(());
            }
            match state.store.purchase(user_id, &product).await {
                Ok(PurchaseOutcome::Delivered { code, inventory_empty }) => {
                    edit_md(
                        &bot,
                        origin,
                        &format!("🛍 Your discount code is ready 🤩\n\n`{}`", code),
                        Some(keyboards::inline_main_menu()),
                    )
                    .await;
                    if inventory_empty {
                        let _ = bot
                            .send_message(
                                ChatId(state.cfg.admin_id),
                                format!("❌ Codes of '{}' are exhausted. Restock soon.", product),
                            )
                            .await;
                    }
                }
                Ok(PurchaseOutcome::NoCodes) => {
                    edit(
                        &bot,
                        origin,
                        &format!("📭 '{}' is sold out right now. Check back later.", product),
                        Some(keyboards::inline_main_menu()),
                    )
                    .await;
                }
                Ok(PurchaseOutcome::InsufficientBalance) => {
                    edit(
                        &bot,
                        origin,
                        "❌ Your balance is not enough for this product. Top up first.",
                        Some(keyboards::charge_keyboard()),
                    )
                    .await;
                }
                Err(e) => {
                    error!("Purchase failed for {}: {:#}", user_id, e);
                    edit(&bot, origin, "⚠️ Something went wrong. Try again.", None).await;
                }
            }
        }

        CallbackAction::ProfileCharge => {
            edit(
                &bot,
                origin,
                "💳 Choose a payment method:",
                Some(keyboards::payment_method_keyboard()),
            )
            .await;
        }

        CallbackAction::ChargeFixed(amount) => {
            if user_blocked(&state, user_id).await {
                edit(&bot, origin, "⛔️ You cannot use the store right now.", None).await;
                return Ok(());
            }
            edit_md(
                &bot,
                origin,
                &format!(
                    "💳 Card to card\n\n\
                     Amount: *{}* toman\n\
                     Card: `{}`\n\
                     Holder: {}\n\n\
                     Transfer the amount, then send a receipt to support so your\n\
                     balance gets credited.",
                    amount, state.cfg.card_number, state.cfg.card_holder
                ),
                Some(keyboards::inline_main_menu()),
            )
            .await;
        }

        CallbackAction::ChargeCustom => {
            edit_md(
                &bot,
                origin,
                &format!(
                    "✏️ Transfer any amount to the card below, then send a receipt to support.\n\n\
                     Card: `{}`\nHolder: {}",
                    state.cfg.card_number, state.cfg.card_holder
                ),
                Some(keyboards::inline_main_menu()),
            )
            .await;
        }

        CallbackAction::CardPayment => {
            if let Some((chat, id)) = origin {
                let _ = bot.delete_message(chat, id).await;
            }
            request_contact(&bot, chat_id).await;
        }

        CallbackAction::CryptoPayment => {
            edit(&bot, origin, "🪙 Choose a currency:", Some(keyboards::crypto_keyboard())).await;
        }

        CallbackAction::TrxPayment => {
            edit(
                &bot,
                origin,
                "🔺 Choose the top-up amount:",
                Some(keyboards::trx_option_keyboard()),
            )
            .await;
        }

        CallbackAction::TrxFixed(amount) => {
            flows::send_trx_invoice(&bot, &state, chat_id, amount).await;
        }

        CallbackAction::TrxCustom => {
            state.dialogues.set(chat_id, Flow::TrxCustomAmount).await;
            edit(
                &bot,
                origin,
                "✏️ Send an amount between 15000 and 1000000 toman:",
                Some(keyboards::cancel_keyboard()),
            )
            .await;
        }

        CallbackAction::Admin(admin_action) => {
            handle_admin(&bot, &state, chat_id, origin, admin_action).await;
        }

        CallbackAction::BannedList(page) => {
            const PER_PAGE: i64 = 10;
            match state.admin.banned_page(page, PER_PAGE).await {
                Ok((ids, total)) => {
                    let body = if ids.is_empty() {
                        "Nobody is banned.".to_string()
                    } else {
                        ids.iter()
                            .map(|id| format!("🚫 {}", id))
                            .collect::<Vec<_>>()
                            .join("\n")
                    };
                    edit(
                        &bot,
                        origin,
                        &format!("📋 Banned users ({} total):\n\n{}", total, body),
                        Some(keyboards::banned_list_keyboard(page, total, PER_PAGE)),
                    )
                    .await;
                }
                Err(e) => {
                    error!("Banned list failed: {:#}", e);
                    edit(&bot, origin, "⚠️ Could not load the banned list.", None).await;
                }
            }
        }

        CallbackAction::RemoveProduct(product) => {
            let removed = state.store.remove_product(&product).await;
            let text = if removed {
                format!("✅ Product '{}' was removed.", product)
            } else {
                format!("❌ Product '{}' no longer exists.", product)
            };
            edit(&bot, origin, &text, Some(keyboards::admin_panel())).await;
        }

        CallbackAction::RenameProduct(product) => {
            state
                .dialogues
                .set(chat_id, Flow::RenameButtonInput { original: product.clone() })
                .await;
            edit(
                &bot,
                origin,
                &format!("✏️ Send the new name for '{}':", product),
                Some(keyboards::cancel_keyboard()),
            )
            .await;
        }

        CallbackAction::IncreasePriceOf(product) | CallbackAction::DecreasePriceOf(product) => {
            let Some(price) = state.store.price_of(&product).await else {
                edit(&bot, origin, "❌ That product no longer exists.", None).await;
                return Ok(());
            };
            state
                .dialogues
                .set(chat_id, Flow::PriceInput { product: product.clone() })
                .await;
            edit(
                &bot,
                origin,
                &format!(
                    "'{}' currently costs {} toman. Send the new price:",
                    product, price
                ),
                Some(keyboards::cancel_keyboard()),
            )
            .await;
        }

        CallbackAction::DeleteCodesOf(product) => match state.store.stored_path(&product).await {
            Some(path) => {
                state
                    .dialogues
                    .set(chat_id, Flow::DeleteCodesConfirm { service: product.clone() })
                    .await;
                edit_md(
                    &bot,
                    origin,
                    &format!(
                        "🗑 To delete the codes of '{}', type its file path exactly:\n`{}`",
                        product, path
                    ),
                    Some(keyboards::cancel_keyboard()),
                )
                .await;
            }
            None => {
                edit(
                    &bot,
                    origin,
                    &format!("'{}' has no code file registered.", product),
                    Some(keyboards::admin_panel()),
                )
                .await;
            }
        },

        CallbackAction::GiftManual => {
            state.dialogues.set(chat_id, Flow::GiftManualAmount).await;
            edit(
                &bot,
                origin,
                "✍️ Send the gift amount in toman:",
                Some(keyboards::cancel_keyboard()),
            )
            .await;
        }

        CallbackAction::GiftRandom => {
            state.dialogues.set(chat_id, Flow::GiftRandomCount).await;
            edit(
                &bot,
                origin,
                "🎲 Send the number of winners:",
                Some(keyboards::cancel_keyboard()),
            )
            .await;
        }

        CallbackAction::StatsProducts => {
            let names = state.store.product_names().await;
            if names.is_empty() {
                edit(&bot, origin, "📭 There are no products yet.", None).await;
            } else {
                edit(
                    &bot,
                    origin,
                    "📦 Choose a product:",
                    Some(keyboards::product_keyboard(&names, CallbackAction::StatsProduct)),
                )
                .await;
            }
        }

        CallbackAction::StatsProduct(product) => {
            match state.stats.product_stats(&product).await {
                Some(stats) => {
                    let kb = InlineKeyboardMarkup::new(vec![
                        vec![InlineKeyboardButton::callback(
                            "💵 Sales details",
                            CallbackAction::SalesStats(product.clone()).data(),
                        )],
                        vec![InlineKeyboardButton::callback(
                            "❌ Cancel",
                            CallbackAction::Cancel.data(),
                        )],
                    ]);
                    edit(
                        &bot,
                        origin,
                        &format!(
                            "📦 {}\n\n\
                             💰 Price: {} toman\n\
                             🗂 Codes in file: {}\n\
                             🛍 Sold: {}\n\
                             📦 Remaining: {}",
                            product, stats.price, stats.total_codes, stats.sold, stats.available
                        ),
                        Some(kb),
                    )
                    .await;
                }
                None => {
                    edit(&bot, origin, "❌ That product no longer exists.", None).await;
                }
            }
        }

        CallbackAction::SalesStats(product) => {
            let sales = state.stats.sales_stats(&product).await;
            let mut lines = vec![format!("💵 Sales of {}", product), String::new()];
            lines.push(format!("Total revenue: {} toman", sales.revenue));
            if !sales.buyers.is_empty() {
                lines.push(String::new());
                for (id, name, paid) in &sales.buyers {
                    lines.push(format!("▫️ {} ({}) - {} toman", id, name, paid));
                }
            }
            edit(&bot, origin, &lines.join("\n"), Some(keyboards::stats_panel_keyboard())).await;
        }

        CallbackAction::StatsUsers => {
            let report = state.stats.user_report().await;
            edit_md(&bot, origin, &report, Some(keyboards::user_stats_keyboard())).await;
        }

        CallbackAction::StatsOverall => {
            let overview = state.stats.weekly_overview(Utc::now()).await;
            edit(
                &bot,
                origin,
                &format!(
                    "📅 Last 7 days\n\n\
                     💰 Total charged: {} toman\n\
                     📈 Largest top-up: {} toman\n\
                     🛍 Codes sold: {}\n\
                     🎁 Gift codes created so far: {}",
                    overview.charged_total,
                    overview.charged_max,
                    overview.codes_sold,
                    overview.gift_codes_created
                ),
                Some(keyboards::stats_panel_keyboard()),
            )
            .await;
        }

        CallbackAction::SearchUser => {
            state.dialogues.set(chat_id, Flow::SearchUserInput).await;
            edit(
                &bot,
                origin,
                "🔍 Send the numeric user id:",
                Some(keyboards::cancel_keyboard()),
            )
            .await;
        }

        CallbackAction::Cancel => {
            state.dialogues.clear(chat_id).await;
            let kb = if state.is_admin(user_id) {
                Some(keyboards::admin_panel())
            } else {
                Some(keyboards::inline_main_menu())
            };
            edit(&bot, origin, "Operation cancelled.", kb).await;
        }
    }

    Ok(())
}

async fn handle_admin(
    bot: &Bot,
    state: &AppState,
    chat_id: ChatId,
    origin: Option<(ChatId, MessageId)>,
    action: AdminAction,
) {
    // Simple flow starters share one shape: store the first step, prompt.
    let flow_prompt: Option<(Flow, &str)> = match &action {
        AdminAction::AddCredit => Some((Flow::AddCreditAmount, "➕ Send the amount to add:")),
        AdminAction::SubtractCredit => {
            Some((Flow::SubCreditAmount, "➖ Send the amount to subtract:"))
        }
        AdminAction::Ban => Some((Flow::BanTarget, "🚫 Send the user id to ban:")),
        AdminAction::Unban => Some((Flow::UnbanTarget, "♻️ Send the user id to unban:")),
        AdminAction::DirectMessage => {
            Some((Flow::DirectMessageTarget, "✉️ Send the recipient's user id:"))
        }
        AdminAction::Balance => Some((Flow::BalanceTarget, "💰 Send the user id to look up:")),
        AdminAction::RecentPurchases => {
            Some((Flow::RecentPurchasesTarget, "🧾 Send the user id to look up:"))
        }
        AdminAction::AddCodes => Some((Flow::AddCodesService, "📥 Send the product name:")),
        AdminAction::Broadcast => Some((Flow::BroadcastText, "📢 Send the broadcast text:")),
        AdminAction::Forward => {
            Some((Flow::ForwardMessage, "↪️ Send or forward the message to distribute:"))
        }
        AdminAction::AddButton => Some((Flow::AddButtonName, "🆕 Send the new product name:")),
        _ => None,
    };
    if let Some((flow, text)) = flow_prompt {
        state.dialogues.set(chat_id, flow).await;
        edit(bot, origin, text, Some(keyboards::cancel_keyboard())).await;
        return;
    }

    match action {
        AdminAction::DeleteCodes => {
            product_picker(bot, state, origin, "🗑 Whose codes should be deleted?", |p| {
                CallbackAction::DeleteCodesOf(p)
            })
            .await;
        }
        AdminAction::RemoveButton => {
            product_picker(bot, state, origin, "❌ Which product should be removed?", |p| {
                CallbackAction::RemoveProduct(p)
            })
            .await;
        }
        AdminAction::RenameButton => {
            product_picker(bot, state, origin, "✏️ Which product should be renamed?", |p| {
                CallbackAction::RenameProduct(p)
            })
            .await;
        }
        AdminAction::IncreasePrice => {
            product_picker(bot, state, origin, "📈 Which product gets a new price?", |p| {
                CallbackAction::IncreasePriceOf(p)
            })
            .await;
        }
        AdminAction::DecreasePrice => {
            product_picker(bot, state, origin, "📉 Which product gets a new price?", |p| {
                CallbackAction::DecreasePriceOf(p)
            })
            .await;
        }

        AdminAction::TurnOn => {
            state.admin.set_active(true).await;
            edit(bot, origin, "🟢 The bot is on.", Some(keyboards::admin_panel())).await;
        }
        AdminAction::TurnOff => {
            state.admin.set_active(false).await;
            edit(bot, origin, "🔴 The bot is off.", Some(keyboards::admin_panel())).await;
        }

        AdminAction::Stats => {
            edit(bot, origin, "📊 Statistics:", Some(keyboards::stats_panel_keyboard())).await;
        }
        AdminAction::CreateGift => {
            edit(bot, origin, "🎁 How should the gift be handed out?", Some(keyboards::gift_choice_keyboard()))
                .await;
        }

        AdminAction::UsersFile => {
            if let Err(e) = state.roster.rewrite_users_file().await {
                error!("Users file rewrite failed: {:#}", e);
            }
            let (count, balance) = state.stats.totals().await;
            let _ = bot
                .send_document(chat_id, InputFile::file(state.roster.users_file_path()))
                .caption(format!("👤 {} users, 💳 {} toman combined balance.", count, balance))
                .await;
        }
        AdminAction::PhonesFile => {
            let count = state.roster.phone_line_count().await;
            if count == 0 {
                edit(bot, origin, "📭 No phone numbers recorded yet.", Some(keyboards::admin_panel()))
                    .await;
            } else {
                let _ = bot
                    .send_document(chat_id, InputFile::file(state.roster.phones_file_path()))
                    .caption(format!("📱 {} phone entries.", count))
                    .await;
            }
        }
        AdminAction::BackupDb => match state.cfg.database_url.strip_prefix("sqlite://") {
            Some(path) if !path.is_empty() => {
                let _ = bot
                    .send_document(chat_id, InputFile::file(path.to_string()))
                    .caption("💾 Database backup.")
                    .await;
            }
            _ => {
                edit(bot, origin, "❌ The database is not file-backed.", Some(keyboards::admin_panel()))
                    .await;
            }
        },

        // Flow starters were handled above.
        _ => {}
    }
}

async fn product_picker<F>(
    bot: &Bot,
    state: &AppState,
    origin: Option<(ChatId, MessageId)>,
    title: &str,
    to_action: F,
) where
    F: Fn(String) -> CallbackAction,
{
    let names = state.store.product_names().await;
    if names.is_empty() {
        edit(bot, origin, "📭 There are no products yet.", Some(keyboards::admin_panel())).await;
    } else {
        edit(bot, origin, title, Some(keyboards::product_keyboard(&names, to_action))).await;
    }
}

fn requires_admin(action: &CallbackAction) -> bool {
    matches!(
        action,
        CallbackAction::Admin(_)
            | CallbackAction::BannedList(_)
            | CallbackAction::RemoveProduct(_)
            | CallbackAction::RenameProduct(_)
            | CallbackAction::IncreasePriceOf(_)
            | CallbackAction::DecreasePriceOf(_)
            | CallbackAction::DeleteCodesOf(_)
            | CallbackAction::GiftManual
            | CallbackAction::GiftRandom
            | CallbackAction::StatsProducts
            | CallbackAction::StatsProduct(_)
            | CallbackAction::SalesStats(_)
            | CallbackAction::StatsUsers
            | CallbackAction::StatsOverall
            | CallbackAction::SearchUser
    )
}

async fn user_blocked(state: &AppState, user_id: i64) -> bool {
    if state.is_admin(user_id) {
        return false;
    }
    state.admin.is_banned(user_id).await || !state.admin.is_active().await
}

async fn request_contact(bot: &Bot, chat_id: ChatId) {
    let _ = bot
        .send_message(chat_id, "📱 First share the number you will pay with:")
        .reply_markup(keyboards::contact_request_keyboard())
        .await;
}

async fn edit(
    bot: &Bot,
    origin: Option<(ChatId, MessageId)>,
    text: &str,
    kb: Option<InlineKeyboardMarkup>,
) {
    let Some((chat, id)) = origin else { return };
    let request = bot.edit_message_text(chat, id, text);
    let result = match kb {
        Some(kb) => request.reply_markup(kb).await,
        None => request.await,
    };
    if let Err(e) = result {
        warn!("edit_message_text failed: {}", e);
    }
}

async fn edit_md(
    bot: &Bot,
    origin: Option<(ChatId, MessageId)>,
    text: &str,
    kb: Option<InlineKeyboardMarkup>,
) {
    let Some((chat, id)) = origin else { return };
    let request = bot
        .edit_message_text(chat, id, text)
        .parse_mode(ParseMode::Markdown);
    let result = match kb {
        Some(kb) => request.reply_markup(kb).await,
        None => request.await,
    };
    if let Err(e) = result {
        warn!("edit_message_text failed: {}", e);
    }
}
