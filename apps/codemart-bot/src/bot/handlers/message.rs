use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::error;

use crate::bot::handlers::flows;
use crate::bot::keyboards;
use crate::bot::utils;
use crate::dialogue::Flow;
use crate::state::AppState;

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    state: AppState,
) -> Result<(), teloxide::RequestError> {
    if !msg.chat.is_private() {
        return Ok(());
    }
    let Some(from) = msg.from.clone() else {
        return Ok(());
    };
    let user_id = from.id.0 as i64;
    let chat_id = msg.chat.id;
    let is_admin = state.is_admin(user_id);

    if let Some(contact) = msg.contact() {
        return handle_contact(&bot, &msg, &state, user_id, &contact.phone_number).await;
    }

    let text = msg.text().map(str::to_string);

    // An active flow consumes any non-command input for this chat.
    if let Some(flow) = state.dialogues.get(chat_id).await {
        let is_command = text.as_deref().is_some_and(|t| t.starts_with('/'));
        if !is_command {
            return flows::advance(&bot, &msg, &state, flow).await;
        }
    }

    let Some(text) = text else {
        return Ok(());
    };

    match text.as_str() {
        "/start" => {
            if blocked(&bot, &state, chat_id, user_id, is_admin).await? {
                return Ok(());
            }
            let display_name = from
                .username
                .as_ref()
                .map(|u| format!("@{}", u))
                .unwrap_or_else(|| from.first_name.clone());
            if let Err(e) = state.roster.register(user_id, &display_name).await {
                error!("Failed to register user {}: {:#}", user_id, e);
            }

            if let Some(channel) =
                utils::missing_membership(&bot, &state.cfg.required_channels, user_id).await
            {
                let _ = bot
                    .send_message(
                        chat_id,
                        format!(
                            "👋 Welcome!\n\nTo use the bot you must first join {}.\n\
                             Join and then press the button below.",
                            channel
                        ),
                    )
                    .reply_markup(keyboards::membership_keyboard(&state.cfg.required_channels))
                    .await;
                return Ok(());
            }

            let _ = bot
                .send_message(
                    chat_id,
                    "🛒 Welcome to the discount-code store!\n\nPick an option from the menu below.",
                )
                .reply_markup(keyboards::main_menu())
                .await;
            if is_admin {
                let _ = bot
                    .send_message(chat_id, "🔑 Admin detected. Use /panel for the control panel.")
                    .await;
            }
        }

        "/panel" => {
            if !is_admin {
                return Ok(());
            }
            let _ = bot
                .send_message(chat_id, "🛠 Admin panel:")
                .reply_markup(keyboards::admin_panel())
                .await;
        }

        "/cancel" => {
            state.dialogues.clear(chat_id).await;
            let _ = bot
                .send_message(chat_id, "Operation cancelled.")
                .reply_markup(keyboards::main_menu())
                .await;
        }

        "🛍 Buy Product" => {
            if blocked(&bot, &state, chat_id, user_id, is_admin).await? {
                return Ok(());
            }
            if let Some(channel) =
                utils::missing_membership(&bot, &state.cfg.required_channels, user_id).await
            {
                let _ = bot
                    .send_message(chat_id, format!("⛔️ You must join {} first.", channel))
                    .reply_markup(keyboards::membership_keyboard(&state.cfg.required_channels))
                    .await;
                return Ok(());
            }
            send_product_list(&bot, &state, chat_id).await;
        }

        "👤 My Account" => {
            if blocked(&bot, &state, chat_id, user_id, is_admin).await? {
                return Ok(());
            }
            let view = state.credit.account_view(user_id).await;
            let _ = bot
                .send_message(
                    chat_id,
                    format!(
                        "👤 Your account\n\n\
                         🆔 Id: `{}`\n\
                         💳 Balance: *{}* toman\n\
                         💰 Total charged: *{}* toman\n\
                         🛍 Codes purchased: *{}*",
                        view.user_id, view.balance, view.charged, view.purchased
                    ),
                )
                .parse_mode(ParseMode::Markdown)
                .reply_markup(keyboards::profile_keyboard())
                .await;
        }

        "💳 Top Up" => {
            if blocked(&bot, &state, chat_id, user_id, is_admin).await? {
                return Ok(());
            }
            let _ = bot
                .send_message(chat_id, "💳 Choose a payment method:")
                .reply_markup(keyboards::payment_method_keyboard())
                .await;
        }

        "🧑‍💻 Support" => match keyboards::support_keyboard(&state.cfg.support_url) {
            Some(kb) => {
                let _ = bot
                    .send_message(chat_id, "🧑‍💻 Need help? Contact support with the button below.")
                    .reply_markup(kb)
                    .await;
            }
            None => {
                let _ = bot
                    .send_message(chat_id, "❌ Support contact is not configured yet.")
                    .await;
            }
        },

        "📣 Our Channels" => {
            if state.cfg.required_channels.is_empty() {
                let _ = bot.send_message(chat_id, "No channels configured.").await;
            } else {
                let list = state
                    .cfg
                    .required_channels
                    .iter()
                    .map(|c| format!("📣 {}", c))
                    .collect::<Vec<_>>()
                    .join("\n");
                let _ = bot.send_message(chat_id, list).await;
            }
        }

        "🎁 Gift Code" => {
            if blocked(&bot, &state, chat_id, user_id, is_admin).await? {
                return Ok(());
            }
            state.dialogues.set(chat_id, Flow::GiftRedeem).await;
            let _ = bot
                .send_message(chat_id, "🎁 Send your gift code:")
                .reply_markup(keyboards::cancel_keyboard())
                .await;
        }

        _ => {}
    }

    Ok(())
}

/// Ban and bot-off gate for user-facing entry points. The admin passes both.
async fn blocked(
    bot: &Bot,
    state: &AppState,
    chat_id: ChatId,
    user_id: i64,
    is_admin: bool,
) -> Result<bool, teloxide::RequestError> {
    if is_admin {
        return Ok(false);
    }
    if state.admin.is_banned(user_id).await {
        let _ = bot
            .send_message(chat_id, "⛔️ You are banned from this bot.")
            .await;
        return Ok(true);
    }
    if !state.admin.is_active().await {
        let _ = bot
            .send_message(chat_id, "🔴 The bot is temporarily off. Try again later.")
            .await;
        return Ok(true);
    }
    Ok(false)
}

pub async fn send_product_list(bot: &Bot, state: &AppState, chat_id: ChatId) {
    let names = state.store.product_names().await;
    if names.is_empty() {
        let _ = bot
            .send_message(chat_id, "📭 No products are on sale right now.")
            .await;
        return;
    }
    let mut lines = vec!["🛍 Available products:".to_string()];
    for name in &names {
        if let Some(price) = state.store.price_of(name).await {
            lines.push(format!("▫️ {} - {} toman", name, price));
        }
    }
    let _ = bot
        .send_message(chat_id, lines.join("\n"))
        .reply_markup(keyboards::product_keyboard(&names, |p| {
            crate::bot::callback_data::CallbackAction::Buy(p)
        }))
        .await;
}

async fn handle_contact(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
    user_id: i64,
    phone: &str,
) -> Result<(), teloxide::RequestError> {
    if !utils::is_iranian_number(phone) {
        let _ = bot
            .send_message(
                msg.chat.id,
                "❌ Only Iranian numbers (starting with 98 or +98) are accepted.",
            )
            .await;
        return Ok(());
    }
    if let Err(e) = state.roster.record_phone(user_id, phone).await {
        error!("Failed to record phone for {}: {:#}", user_id, e);
        let _ = bot
            .send_message(msg.chat.id, "⚠️ Something went wrong. Try again later.")
            .await;
        return Ok(());
    }
    let _ = bot
        .send_message(msg.chat.id, "✅ Number received. Choose the top-up amount:")
        .reply_markup(keyboards::charge_keyboard())
        .await;
    let _ = bot
        .send_message(
            ChatId(state.cfg.admin_id),
            format!("📱 User `{}` shared the number {}.", user_id, phone),
        )
        .parse_mode(ParseMode::Markdown)
        .await;
    Ok(())
}
