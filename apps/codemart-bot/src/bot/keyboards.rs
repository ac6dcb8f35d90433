use teloxide::types::{
    ButtonRequest, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
};

use crate::bot::callback_data::{AdminAction, CallbackAction};

const CHARGE_AMOUNTS: [i64; 3] = [10000, 20000, 50000];
const TRX_AMOUNTS: [i64; 4] = [10000, 20000, 30000, 50000];

fn cb(text: impl Into<String>, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text.into(), action.data())
}

pub fn main_menu() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new("🛍 Buy Product")],
        vec![
            KeyboardButton::new("👤 My Account"),
            KeyboardButton::new("💳 Top Up"),
        ],
        vec![
            KeyboardButton::new("🧑‍💻 Support"),
            KeyboardButton::new("📣 Our Channels"),
        ],
        vec![KeyboardButton::new("🎁 Gift Code")],
    ])
    .resize_keyboard()
}

pub fn contact_request_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![
        KeyboardButton::new("📱 Share my number").request(ButtonRequest::Contact)
    ]])
    .resize_keyboard()
}

pub fn inline_main_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![cb("🏠 Main menu", CallbackAction::MainMenu)]])
}

pub fn cancel_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![cb("❌ Cancel", CallbackAction::Cancel)]])
}

pub fn membership_keyboard(channels: &[String]) -> InlineKeyboardMarkup {
    let mut buttons: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    for channel in channels {
        let url = format!("https://t.me/{}", channel.trim_start_matches('@'));
        if let Ok(url) = url.parse() {
            buttons.push(vec![InlineKeyboardButton::url(channel.clone(), url)]);
        }
    }
    buttons.push(vec![cb("✅ I have joined", CallbackAction::ConfirmMembership)]);
    InlineKeyboardMarkup::new(buttons)
}

pub fn support_keyboard(support_url: &str) -> Option<InlineKeyboardMarkup> {
    let url = support_url.parse().ok()?;
    Some(InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::url("💬 Contact support", url),
    ]]))
}

/// One button per product, one per row, with a main-menu row at the end.
pub fn product_keyboard<F>(names: &[String], to_action: F) -> InlineKeyboardMarkup
where
    F: Fn(String) -> CallbackAction,
{
    let mut buttons: Vec<Vec<InlineKeyboardButton>> = names
        .iter()
        .map(|name| vec![cb(name.clone(), to_action(name.clone()))])
        .collect();
    buttons.push(vec![cb("🏠 Main menu", CallbackAction::MainMenu)]);
    InlineKeyboardMarkup::new(buttons)
}

pub fn profile_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![cb("💳 Top up", CallbackAction::ProfileCharge)]])
}

pub fn charge_keyboard() -> InlineKeyboardMarkup {
    let mut buttons: Vec<Vec<InlineKeyboardButton>> = CHARGE_AMOUNTS
        .iter()
        .map(|&amount| {
            vec![cb(
                format!("💳 {} toman", amount),
                CallbackAction::ChargeFixed(amount),
            )]
        })
        .collect();
    buttons.push(vec![cb("✏️ Custom amount", CallbackAction::ChargeCustom)]);
    buttons.push(vec![cb("🏠 Main menu", CallbackAction::MainMenu)]);
    InlineKeyboardMarkup::new(buttons)
}

pub fn payment_method_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![cb("💳 Card to card", CallbackAction::CardPayment)],
        vec![cb("🪙 Crypto", CallbackAction::CryptoPayment)],
        vec![cb("🏠 Main menu", CallbackAction::MainMenu)],
    ])
}

pub fn crypto_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![cb("🔺 TRX (Tron)", CallbackAction::TrxPayment)],
        vec![cb("🏠 Main menu", CallbackAction::MainMenu)],
    ])
}

pub fn trx_option_keyboard() -> InlineKeyboardMarkup {
    let mut buttons: Vec<Vec<InlineKeyboardButton>> = TRX_AMOUNTS
        .iter()
        .map(|&amount| {
            vec![cb(
                format!("🔺 {} toman", amount),
                CallbackAction::TrxFixed(amount),
            )]
        })
        .collect();
    buttons.push(vec![cb("✏️ Custom amount", CallbackAction::TrxCustom)]);
    buttons.push(vec![cb("🏠 Main menu", CallbackAction::MainMenu)]);
    InlineKeyboardMarkup::new(buttons)
}

pub fn admin_panel() -> InlineKeyboardMarkup {
    use AdminAction::*;
    InlineKeyboardMarkup::new(vec![
        vec![
            cb("➕ Add credit", CallbackAction::Admin(AddCredit)),
            cb("➖ Subtract credit", CallbackAction::Admin(SubtractCredit)),
        ],
        vec![
            cb("🚫 Ban user", CallbackAction::Admin(Ban)),
            cb("♻️ Unban user", CallbackAction::Admin(Unban)),
        ],
        vec![
            cb("📋 Banned list", CallbackAction::BannedList(0)),
            cb("✉️ Message user", CallbackAction::Admin(DirectMessage)),
        ],
        vec![
            cb("💰 User balance", CallbackAction::Admin(Balance)),
            cb("🧾 Recent purchases", CallbackAction::Admin(RecentPurchases)),
        ],
        vec![
            cb("📥 Add codes", CallbackAction::Admin(AddCodes)),
            cb("🗑 Delete codes", CallbackAction::Admin(DeleteCodes)),
        ],
        vec![
            cb("🆕 Add product", CallbackAction::Admin(AddButton)),
            cb("❌ Remove product", CallbackAction::Admin(RemoveButton)),
        ],
        vec![
            cb("✏️ Rename product", CallbackAction::Admin(RenameButton)),
            cb("🎁 Create gift code", CallbackAction::Admin(CreateGift)),
        ],
        vec![
            cb("📈 Increase price", CallbackAction::Admin(IncreasePrice)),
            cb("📉 Decrease price", CallbackAction::Admin(DecreasePrice)),
        ],
        vec![
            cb("📢 Broadcast", CallbackAction::Admin(Broadcast)),
            cb("↪️ Forward", CallbackAction::Admin(Forward)),
        ],
        vec![
            cb("🟢 Turn bot on", CallbackAction::Admin(TurnOn)),
            cb("🔴 Turn bot off", CallbackAction::Admin(TurnOff)),
        ],
        vec![
            cb("📊 Statistics", CallbackAction::Admin(Stats)),
            cb("📄 Users file", CallbackAction::Admin(UsersFile)),
        ],
        vec![
            cb("📱 Phones file", CallbackAction::Admin(PhonesFile)),
            cb("💾 Database backup", CallbackAction::Admin(BackupDb)),
        ],
    ])
}

pub fn gift_choice_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![cb("✍️ Manual code", CallbackAction::GiftManual)],
        vec![cb("🎲 Random winners", CallbackAction::GiftRandom)],
        vec![cb("❌ Cancel", CallbackAction::Cancel)],
    ])
}

pub fn stats_panel_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![cb("📦 Product stats", CallbackAction::StatsProducts)],
        vec![cb("👥 User stats", CallbackAction::StatsUsers)],
        vec![cb("📅 Weekly overview", CallbackAction::StatsOverall)],
        vec![cb("❌ Cancel", CallbackAction::Cancel)],
    ])
}

pub fn user_stats_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![cb("🔍 Search user", CallbackAction::SearchUser)]])
}

pub fn banned_list_keyboard(page: i64, total: i64, per_page: i64) -> InlineKeyboardMarkup {
    let mut nav = Vec::new();
    if page > 0 {
        nav.push(cb("⬅️ Previous", CallbackAction::BannedList(page - 1)));
    }
    if (page + 1) * per_page < total {
        nav.push(cb("➡️ Next", CallbackAction::BannedList(page + 1)));
    }
    let mut buttons = Vec::new();
    if !nav.is_empty() {
        buttons.push(nav);
    }
    buttons.push(vec![cb("❌ Cancel", CallbackAction::Cancel)]);
    InlineKeyboardMarkup::new(buttons)
}
