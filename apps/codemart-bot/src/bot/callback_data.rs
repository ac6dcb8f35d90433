//! Typed callback payloads. Every inline button is built from a
//! [`CallbackAction`] and every incoming callback query is decoded back
//! through [`CallbackAction::parse`], so unknown strings can only come
//! from stale keyboards.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminAction {
    AddCredit,
    SubtractCredit,
    Ban,
    Unban,
    DirectMessage,
    Balance,
    RecentPurchases,
    AddCodes,
    DeleteCodes,
    Broadcast,
    Forward,
    AddButton,
    RemoveButton,
    RenameButton,
    IncreasePrice,
    DecreasePrice,
    TurnOn,
    TurnOff,
    Stats,
    CreateGift,
    UsersFile,
    PhonesFile,
    BackupDb,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    MainMenu,
    ConfirmMembership,
    Buy(String),
    ProfileCharge,
    ChargeFixed(i64),
    ChargeCustom,
    CardPayment,
    CryptoPayment,
    TrxPayment,
    TrxFixed(i64),
    TrxCustom,
    Admin(AdminAction),
    BannedList(i64),
    RemoveProduct(String),
    RenameProduct(String),
    IncreasePriceOf(String),
    DecreasePriceOf(String),
    DeleteCodesOf(String),
    GiftManual,
    GiftRandom,
    StatsProducts,
    StatsProduct(String),
    SalesStats(String),
    StatsUsers,
    StatsOverall,
    SearchUser,
    Cancel,
}

impl AdminAction {
    fn data(&self) -> &'static str {
        match self {
            AdminAction::AddCredit => "admin_add_credit",
            AdminAction::SubtractCredit => "admin_subtract_credit",
            AdminAction::Ban => "admin_ban",
            AdminAction::Unban => "admin_unban",
            AdminAction::DirectMessage => "admin_message",
            AdminAction::Balance => "admin_balance",
            AdminAction::RecentPurchases => "admin_recent_purchases",
            AdminAction::AddCodes => "admin_add_codes",
            AdminAction::DeleteCodes => "admin_delete_codes",
            AdminAction::Broadcast => "admin_broadcast",
            AdminAction::Forward => "admin_forward",
            AdminAction::AddButton => "admin_add_button",
            AdminAction::RemoveButton => "admin_remove_button",
            AdminAction::RenameButton => "admin_rename_button",
            AdminAction::IncreasePrice => "admin_increase_price",
            AdminAction::DecreasePrice => "admin_decrease_price",
            AdminAction::TurnOn => "admin_turn_on",
            AdminAction::TurnOff => "admin_turn_off",
            AdminAction::Stats => "admin_stats",
            AdminAction::CreateGift => "admin_create_gift",
            AdminAction::UsersFile => "admin_users_file",
            AdminAction::PhonesFile => "admin_phones_file",
            AdminAction::BackupDb => "admin_backup_db",
        }
    }

    fn parse(data: &str) -> Option<Self> {
        Some(match data {
            "admin_add_credit" => AdminAction::AddCredit,
            "admin_subtract_credit" => AdminAction::SubtractCredit,
            "admin_ban" => AdminAction::Ban,
            "admin_unban" => AdminAction::Unban,
            "admin_message" => AdminAction::DirectMessage,
            "admin_balance" => AdminAction::Balance,
            "admin_recent_purchases" => AdminAction::RecentPurchases,
            "admin_add_codes" => AdminAction::AddCodes,
            "admin_delete_codes" => AdminAction::DeleteCodes,
            "admin_broadcast" => AdminAction::Broadcast,
            "admin_forward" => AdminAction::Forward,
            "admin_add_button" => AdminAction::AddButton,
            "admin_remove_button" => AdminAction::RemoveButton,
            "admin_rename_button" => AdminAction::RenameButton,
            "admin_increase_price" => AdminAction::IncreasePrice,
            "admin_decrease_price" => AdminAction::DecreasePrice,
            "admin_turn_on" => AdminAction::TurnOn,
            "admin_turn_off" => AdminAction::TurnOff,
            "admin_stats" => AdminAction::Stats,
            "admin_create_gift" => AdminAction::CreateGift,
            "admin_users_file" => AdminAction::UsersFile,
            "admin_phones_file" => AdminAction::PhonesFile,
            "admin_backup_db" => AdminAction::BackupDb,
            _ => return None,
        })
    }
}

impl CallbackAction {
    /// The wire form carried in `callback_data`.
    pub fn data(&self) -> String {
        match self {
            CallbackAction::MainMenu => "main_menu".to_string(),
            CallbackAction::ConfirmMembership => "confirm_membership".to_string(),
            CallbackAction::Buy(product) => format!("buy:{}", product),
            CallbackAction::ProfileCharge => "profile_charge".to_string(),
            CallbackAction::ChargeFixed(amount) => format!("charge:{}", amount),
            CallbackAction::ChargeCustom => "charge_custom".to_string(),
            CallbackAction::CardPayment => "pay_card".to_string(),
            CallbackAction::CryptoPayment => "pay_crypto".to_string(),
            CallbackAction::TrxPayment => "pay_trx".to_string(),
            CallbackAction::TrxFixed(amount) => format!("trx:{}", amount),
            CallbackAction::TrxCustom => "trx_custom".to_string(),
            CallbackAction::Admin(action) => action.data().to_string(),
            CallbackAction::BannedList(page) => format!("banned_list:{}", page),
            CallbackAction::RemoveProduct(product) => format!("remove:{}", product),
            CallbackAction::RenameProduct(product) => format!("rename:{}", product),
            CallbackAction::IncreasePriceOf(product) => format!("increase:{}", product),
            CallbackAction::DecreasePriceOf(product) => format!("decrease:{}", product),
            CallbackAction::DeleteCodesOf(product) => format!("delete:{}", product),
            CallbackAction::GiftManual => "gift_manual".to_string(),
            CallbackAction::GiftRandom => "gift_random".to_string(),
            CallbackAction::StatsProducts => "stats_products".to_string(),
            CallbackAction::StatsProduct(product) => format!("stats_product:{}", product),
            CallbackAction::SalesStats(product) => format!("sales_stats:{}", product),
            CallbackAction::StatsUsers => "stats_users".to_string(),
            CallbackAction::StatsOverall => "stats_overall".to_string(),
            CallbackAction::SearchUser => "search_user".to_string(),
            CallbackAction::Cancel => "cancel".to_string(),
        }
    }

    pub fn parse(data: &str) -> Option<Self> {
        if let Some(action) = AdminAction::parse(data) {
            return Some(CallbackAction::Admin(action));
        }
        if let Some((tag, arg)) = data.split_once(':') {
            return Some(match tag {
                "buy" => CallbackAction::Buy(arg.to_string()),
                "charge" => CallbackAction::ChargeFixed(arg.parse().ok()?),
                "trx" => CallbackAction::TrxFixed(arg.parse().ok()?),
                "banned_list" => CallbackAction::BannedList(arg.parse().ok()?),
                "remove" => CallbackAction::RemoveProduct(arg.to_string()),
                "rename" => CallbackAction::RenameProduct(arg.to_string()),
                "increase" => CallbackAction::IncreasePriceOf(arg.to_string()),
                "decrease" => CallbackAction::DecreasePriceOf(arg.to_string()),
                "delete" => CallbackAction::DeleteCodesOf(arg.to_string()),
                "stats_product" => CallbackAction::StatsProduct(arg.to_string()),
                "sales_stats" => CallbackAction::SalesStats(arg.to_string()),
                _ => return None,
            });
        }
        Some(match data {
            "main_menu" => CallbackAction::MainMenu,
            "confirm_membership" => CallbackAction::ConfirmMembership,
            "profile_charge" => CallbackAction::ProfileCharge,
            "charge_custom" => CallbackAction::ChargeCustom,
            "pay_card" => CallbackAction::CardPayment,
            "pay_crypto" => CallbackAction::CryptoPayment,
            "pay_trx" => CallbackAction::TrxPayment,
            "trx_custom" => CallbackAction::TrxCustom,
            "gift_manual" => CallbackAction::GiftManual,
            "gift_random" => CallbackAction::GiftRandom,
            "stats_products" => CallbackAction::StatsProducts,
            "stats_users" => CallbackAction::StatsUsers,
            "stats_overall" => CallbackAction::StatsOverall,
            "search_user" => CallbackAction::SearchUser,
            "cancel" => CallbackAction::Cancel,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_action_round_trips_through_its_wire_form() {
        let actions = vec![
            CallbackAction::MainMenu,
            CallbackAction::ConfirmMembership,
            CallbackAction::Buy("snapp food".into()),
            CallbackAction::ProfileCharge,
            CallbackAction::ChargeFixed(20000),
            CallbackAction::ChargeCustom,
            CallbackAction::CardPayment,
            CallbackAction::CryptoPayment,
            CallbackAction::TrxPayment,
            CallbackAction::TrxFixed(50000),
            CallbackAction::TrxCustom,
            CallbackAction::Admin(AdminAction::AddCredit),
            CallbackAction::Admin(AdminAction::Ban),
            CallbackAction::Admin(AdminAction::TurnOff),
            CallbackAction::Admin(AdminAction::BackupDb),
            CallbackAction::BannedList(3),
            CallbackAction::RemoveProduct("tapsi".into()),
            CallbackAction::RenameProduct("tapsi".into()),
            CallbackAction::IncreasePriceOf("tapsi".into()),
            CallbackAction::DecreasePriceOf("tapsi".into()),
            CallbackAction::DeleteCodesOf("tapsi".into()),
            CallbackAction::GiftManual,
            CallbackAction::GiftRandom,
            CallbackAction::StatsProducts,
            CallbackAction::StatsProduct("tapsi".into()),
            CallbackAction::SalesStats("tapsi".into()),
            CallbackAction::StatsUsers,
            CallbackAction::StatsOverall,
            CallbackAction::SearchUser,
            CallbackAction::Cancel,
        ];
        for action in actions {
            assert_eq!(CallbackAction::parse(&action.data()), Some(action));
        }
    }

    #[test]
    fn unknown_payloads_are_rejected() {
        assert_eq!(CallbackAction::parse(""), None);
        assert_eq!(CallbackAction::parse("admin_nope"), None);
        assert_eq!(CallbackAction::parse("charge:abc"), None);
        assert_eq!(CallbackAction::parse("bogus:tag"), None);
    }

    #[test]
    fn product_names_with_spaces_survive() {
        let action = CallbackAction::StatsProduct("uber eats 10%".into());
        assert_eq!(CallbackAction::parse(&action.data()), Some(action));
    }
}
