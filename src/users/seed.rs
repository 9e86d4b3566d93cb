use tracing::info;

use super::{
    repo::UserStore,
    repo_types::NewUser,
    services::hash_password,
};

const SEED_PASSWORD: &str = "password";

// (first name, last name, email, phone)
const SEED_USERS: [(&str, &str, &str, &str); 2] = [
    ("John", "Doe", "john.doe@gmail.com", "532532"),
    ("Tony", "P", "tony.p@gmail.com", "43363453"),
];

/// Insert the initial users when the store is empty.
///
/// Returns how many rows were created.
pub async fn seed_users(store: &dyn UserStore) -> anyhow::Result<usize> {
    let existing = store.find_all().await?;
    if !existing.is_empty() {
        info!(count = existing.len(), "users already present; skipping seed");
        return Ok(0);
    }

    for (first_name, last_name, email, phone) in SEED_USERS {
        let user = store
            .create(NewUser {
                first_name: first_name.into(),
                last_name: last_name.into(),
                email: email.into(),
                phone: phone.into(),
                password_hash: hash_password(SEED_PASSWORD)?,
            })
            .await?;
        info!(user_id = user.id, email = %user.email, "seeded user");
    }
    Ok(SEED_USERS.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::memory::InMemoryUserStore;

    #[tokio::test]
    async fn seeds_empty_store_once() {
        let store = InMemoryUserStore::default();
        assert_eq!(seed_users(&store).await.unwrap(), 2);
        assert_eq!(seed_users(&store).await.unwrap(), 0);

        let users = store.find_all().await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].id, 1);
        assert_eq!(users[0].email, "john.doe@gmail.com");
        assert_eq!(users[1].first_name, "Tony");
        assert_ne!(users[1].password_hash, SEED_PASSWORD);
    }
}
