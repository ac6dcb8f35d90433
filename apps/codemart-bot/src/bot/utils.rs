use teloxide::prelude::*;
use teloxide::types::{ChatMemberKind, Recipient, UserId};

/// Checks the user against every required channel and returns the first
/// one they have not joined. A lookup failure counts as not joined so a
/// misconfigured channel never silently waves users through.
pub async fn missing_membership(
    bot: &Bot,
    channels: &[String],
    user_id: i64,
) -> Option<String> {
    for channel in channels {
        let recipient = Recipient::ChannelUsername(channel.clone());
        match bot.get_chat_member(recipient, UserId(user_id as u64)).await {
            Ok(member) => {
                let joined = matches!(
                    member.kind,
                    ChatMemberKind::Administrator(_)
                        | ChatMemberKind::Owner(_)
                        | ChatMemberKind::Member(_)
                );
                if !joined {
                    tracing::debug!(
                        "User {} is not a member of {} (status: {:?})",
                        user_id,
                        channel,
                        member.kind
                    );
                    return Some(channel.clone());
                }
            }
            Err(e) => {
                tracing::warn!("Membership check for {} in {} failed: {}", user_id, channel, e);
                return Some(channel.clone());
            }
        }
    }
    None
}

/// Accepts Iranian numbers only: `98...` or `+98...`.
pub fn is_iranian_number(phone: &str) -> bool {
    let digits = phone.trim();
    digits.starts_with("98") || digits.starts_with("+98")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iranian_prefix_is_required() {
        assert!(is_iranian_number("989121234567"));
        assert!(is_iranian_number("+989121234567"));
        assert!(is_iranian_number(" +989121234567 "));
        assert!(!is_iranian_number("19121234567"));
        assert!(!is_iranian_number("0989121234567"));
    }
}
