use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::registry::SharedRegistry;

/// Maintains the flat-file side of the state: the append-only registered-id
/// list, the rewritten `users.txt` report and the append-only phone log.
/// These files are not coordinated with the database; after a crash the two
/// can disagree, which is accepted.
#[derive(Clone)]
pub struct RosterService {
    registry: SharedRegistry,
    users_file: PathBuf,
    registered_file: PathBuf,
    phones_file: PathBuf,
}

impl RosterService {
    pub fn new(
        registry: SharedRegistry,
        users_file: PathBuf,
        registered_file: PathBuf,
        phones_file: PathBuf,
    ) -> Self {
        Self {
            registry,
            users_file,
            registered_file,
            phones_file,
        }
    }

    /// Loads the registered-id file into the registry. Unparsable lines are
    /// skipped.
    pub async fn load(&self) -> Result<()> {
        let text = match fs::read_to_string(&self.registered_file).await {
            Ok(t) => t,
            Err(_) => return Ok(()),
        };
        let mut reg = self.registry.write().await;
        for line in text.lines() {
            if let Ok(id) = line.trim().parse::<i64>() {
                reg.registered.insert(id);
            }
        }
        info!("Loaded {} registered users", reg.registered.len());
        Ok(())
    }

    /// Records a /start: caches the display name, appends the id to the
    /// registered file on first sight and rewrites `users.txt`.
    pub async fn register(&self, user_id: i64, display_name: &str) -> Result<()> {
        let newly_registered = {
            let mut reg = self.registry.write().await;
            reg.display_names.insert(user_id, display_name.to_string());
            reg.registered.insert(user_id)
        };
        if newly_registered {
            let mut file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.registered_file)
                .await
                .context("Failed to open registered-users file")?;
            file.write_all(format!("{}\n", user_id).as_bytes())
                .await
                .context("Failed to append registered user")?;
        }
        self.rewrite_users_file().await
    }

    /// Rewrites the whole `users.txt` report (`id - name - balance` lines).
    pub async fn rewrite_users_file(&self) -> Result<()> {
        let snapshot = self.registry.read().await.roster_snapshot();
        let mut out = String::new();
        for (id, name, balance) in snapshot {
            out.push_str(&format!("{} - {} - {}\n", id, name, balance));
        }
        fs::write(&self.users_file, out)
            .await
            .context("Failed to rewrite users file")
    }

    /// Appends a shared phone number to the phone log.
    pub async fn record_phone(&self, user_id: i64, phone: &str) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.phones_file)
            .await
            .context("Failed to open phones file")?;
        file.write_all(format!("USER : {} | Phone : {}\n", user_id, phone).as_bytes())
            .await
            .context("Failed to append phone entry")
    }

    pub async fn phone_line_count(&self) -> usize {
        match fs::read_to_string(&self.phones_file).await {
            Ok(text) => text.lines().count(),
            Err(_) => 0,
        }
    }

    pub fn users_file_path(&self) -> &PathBuf {
        &self.users_file
    }

    pub fn phones_file_path(&self) -> &PathBuf {
        &self.phones_file
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    fn temp_paths(tag: &str) -> (PathBuf, PathBuf, PathBuf) {
        let dir = std::env::temp_dir();
        let pid = std::process::id();
        (
            dir.join(format!("codemart-users-{}-{}.txt", tag, pid)),
            dir.join(format!("codemart-registered-{}-{}.txt", tag, pid)),
            dir.join(format!("codemart-phones-{}-{}.txt", tag, pid)),
        )
    }

    #[tokio::test]
    async fn register_appends_once_and_rewrites_report() {
        let (users, registered, phones) = temp_paths("register");
        let _ = fs::remove_file(&users).await;
        let _ = fs::remove_file(&registered).await;
        let svc = RosterService::new(
            Registry::new().shared(),
            users.clone(),
            registered.clone(),
            phones,
        );

        svc.register(11, "@alice").await.unwrap();
        svc.register(11, "@alice").await.unwrap();
        svc.register(12, "bob").await.unwrap();

        let ids = fs::read_to_string(&registered).await.unwrap();
        assert_eq!(ids, "11\n12\n");
        let report = fs::read_to_string(&users).await.unwrap();
        assert_eq!(report, "11 - @alice - 0\n12 - bob - 0\n");
    }

    #[tokio::test]
    async fn phone_log_appends_and_counts() {
        let (users, registered, phones) = temp_paths("phones");
        let _ = fs::remove_file(&phones).await;
        let svc = RosterService::new(Registry::new().shared(), users, registered, phones);

        svc.record_phone(5, "+989121234567").await.unwrap();
        svc.record_phone(6, "989121110000").await.unwrap();
        assert_eq!(svc.phone_line_count().await, 2);
    }
}
