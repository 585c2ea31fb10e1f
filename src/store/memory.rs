use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    audit,
    named::{
        repo::NamedStore,
        repo_types::{Collection, NamedEntity},
    },
    roles::{repo::RoleStore, repo_types::Role},
    store::Conflict,
    tokens::{
        repo::TokenStore,
        repo_types::{Token, TokenKind},
    },
    users::{repo::UserStore, repo_types::User},
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    named: HashMap<Collection, Vec<NamedEntity>>,
    roles: Vec<Role>,
    tokens: HashMap<TokenKind, Vec<Token>>,
}

/// In-process store with the same semantics as the Postgres one, including
/// the case-insensitive unique constraints and cascading deletes.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    #[cfg(test)]
    fail_token_writes: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl MemoryStore {
    /// Makes every later `save_token` fail.
    pub fn fail_token_writes(&self) {
        self.fail_token_writes
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }
}

fn eq_ci(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

impl Tables {
    fn user_mut(&mut self, id: Uuid) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == id)
    }

    fn user_clashes(&self, user: &User) -> bool {
        self.users.iter().any(|u| {
            u.id != user.id && (eq_ci(&u.username, &user.username) || eq_ci(&u.email, &user.email))
        })
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_all_users(&self) -> anyhow::Result<Vec<User>> {
        Ok(self.tables.read().await.users.clone())
    }

    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| eq_ci(&u.email, email)).cloned())
    }

    async fn find_user_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> anyhow::Result<Option<User>> {
        let username = username.trim();
        let email = email.trim();
        let t = self.tables.read().await;
        Ok(t.users
            .iter()
            .find(|u| {
                (!username.is_empty() && eq_ci(&u.username, username))
                    || (!email.is_empty() && eq_ci(&u.email, email))
            })
            .cloned())
    }

    async fn user_exists(
        &self,
        id: Option<Uuid>,
        username: &str,
        email: &str,
    ) -> anyhow::Result<bool> {
        let t = self.tables.read().await;
        Ok(t.users.iter().any(|u| {
            Some(u.id) == id || eq_ci(&u.username, username) || eq_ci(&u.email, email)
        }))
    }

    async fn add_user(&self, user: User) -> anyhow::Result<User> {
        let mut t = self.tables.write().await;
        if t.users.iter().any(|u| u.id == user.id) || t.user_clashes(&user) {
            return Err(Conflict("user").into());
        }
        t.users.push(user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: User) -> anyhow::Result<Option<User>> {
        let mut t = self.tables.write().await;
        if t.user_clashes(&user) {
            return Err(Conflict("user").into());
        }
        let Some(stored) = t.user_mut(user.id) else {
            return Ok(None);
        };
        // creation data is immutable
        let audit = audit::Audit {
            created_at: stored.audit.created_at,
            created_by: stored.audit.created_by,
            ..user.audit
        };
        *stored = User { audit, ..user };
        Ok(Some(stored.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut t = self.tables.write().await;
        let before = t.users.len();
        t.users.retain(|u| u.id != id);
        if t.users.len() == before {
            return Ok(false);
        }
        for tokens in t.tokens.values_mut() {
            tokens.retain(|tok| tok.user_id != id);
        }
        Ok(true)
    }

    async fn set_user_password(
        &self,
        id: Uuid,
        password_hash: &str,
        modified_by: Option<Uuid>,
    ) -> anyhow::Result<bool> {
        let mut t = self.tables.write().await;
        Ok(t.user_mut(id)
            .map(|u| {
                u.password_hash = Some(password_hash.to_string());
                u.audit.touch(modified_by);
            })
            .is_some())
    }

    async fn set_user_enabled(
        &self,
        id: Uuid,
        enabled: bool,
        modified_by: Option<Uuid>,
    ) -> anyhow::Result<bool> {
        let mut t = self.tables.write().await;
        Ok(t.user_mut(id)
            .map(|u| {
                u.enabled = enabled;
                u.audit.touch(modified_by);
            })
            .is_some())
    }

    async fn set_user_verified(
        &self,
        id: Uuid,
        verified: bool,
        modified_by: Option<Uuid>,
    ) -> anyhow::Result<bool> {
        let mut t = self.tables.write().await;
        Ok(t.user_mut(id)
            .map(|u| {
                u.verified = verified;
                u.audit.touch(modified_by);
            })
            .is_some())
    }
}

#[async_trait]
impl NamedStore for MemoryStore {
    async fn find_all_named(&self, collection: Collection) -> anyhow::Result<Vec<NamedEntity>> {
        let t = self.tables.read().await;
        Ok(t.named.get(&collection).cloned().unwrap_or_default())
    }

    async fn find_named(
        &self,
        collection: Collection,
        id: Uuid,
    ) -> anyhow::Result<Option<NamedEntity>> {
        let t = self.tables.read().await;
        Ok(t.named
            .get(&collection)
            .and_then(|rows| rows.iter().find(|e| e.id == id).cloned()))
    }

    async fn find_all_named_containing(
        &self,
        collection: Collection,
        fragment: &str,
    ) -> anyhow::Result<Vec<NamedEntity>> {
        let needle = fragment.to_lowercase();
        let t = self.tables.read().await;
        Ok(t.named
            .get(&collection)
            .map(|rows| {
                rows.iter()
                    .filter(|e| e.name.to_lowercase().contains(&needle))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn find_named_by_name(
        &self,
        collection: Collection,
        name: &str,
    ) -> anyhow::Result<Option<NamedEntity>> {
        let t = self.tables.read().await;
        let mut matches = t
            .named
            .get(&collection)
            .into_iter()
            .flatten()
            .filter(|e| eq_ci(&e.name, name));
        match (matches.next(), matches.next()) {
            (Some(found), None) => Ok(Some(found.clone())),
            _ => Ok(None),
        }
    }

    async fn named_exists(
        &self,
        collection: Collection,
        id: Option<Uuid>,
        name: &str,
    ) -> anyhow::Result<bool> {
        let t = self.tables.read().await;
        Ok(t.named
            .get(&collection)
            .into_iter()
            .flatten()
            .any(|e| Some(e.id) == id || eq_ci(&e.name, name)))
    }

    async fn add_named(
        &self,
        collection: Collection,
        entity: NamedEntity,
    ) -> anyhow::Result<NamedEntity> {
        let mut t = self.tables.write().await;
        let rows = t.named.entry(collection).or_default();
        if rows
            .iter()
            .any(|e| e.id == entity.id || eq_ci(&e.name, &entity.name))
        {
            return Err(Conflict(collection.noun()).into());
        }
        rows.push(entity.clone());
        Ok(entity)
    }

    async fn update_named(
        &self,
        collection: Collection,
        entity: NamedEntity,
    ) -> anyhow::Result<Option<NamedEntity>> {
        let mut t = self.tables.write().await;
        let rows = t.named.entry(collection).or_default();
        if rows
            .iter()
            .any(|e| e.id != entity.id && eq_ci(&e.name, &entity.name))
        {
            return Err(Conflict(collection.noun()).into());
        }
        let Some(stored) = rows.iter_mut().find(|e| e.id == entity.id) else {
            return Ok(None);
        };
        stored.name = entity.name;
        stored.audit.modified_at = entity.audit.modified_at;
        stored.audit.modified_by = entity.audit.modified_by;
        stored.audit.owner = entity.audit.owner;
        Ok(Some(stored.clone()))
    }

    async fn delete_named(&self, collection: Collection, id: Uuid) -> anyhow::Result<bool> {
        let mut t = self.tables.write().await;
        let rows = t.named.entry(collection).or_default();
        let before = rows.len();
        rows.retain(|e| e.id != id);
        let removed = rows.len() != before;
        if removed && collection == Collection::Permissions {
            for role in &mut t.roles {
                role.permissions.retain(|p| *p != id);
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn find_all_roles(&self) -> anyhow::Result<Vec<Role>> {
        Ok(self.tables.read().await.roles.clone())
    }

    async fn find_role(&self, id: Uuid) -> anyhow::Result<Option<Role>> {
        let t = self.tables.read().await;
        Ok(t.roles.iter().find(|r| r.id == id).cloned())
    }

    async fn find_roles_containing(&self, fragment: &str) -> anyhow::Result<Vec<Role>> {
        let needle = fragment.to_lowercase();
        let t = self.tables.read().await;
        Ok(t.roles
            .iter()
            .filter(|r| r.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn find_role_by_name(&self, name: &str) -> anyhow::Result<Option<Role>> {
        let t = self.tables.read().await;
        let mut matches = t.roles.iter().filter(|r| eq_ci(&r.name, name));
        match (matches.next(), matches.next()) {
            (Some(found), None) => Ok(Some(found.clone())),
            _ => Ok(None),
        }
    }

    async fn role_exists(&self, id: Option<Uuid>, name: &str) -> anyhow::Result<bool> {
        let t = self.tables.read().await;
        Ok(t.roles
            .iter()
            .any(|r| Some(r.id) == id || eq_ci(&r.name, name)))
    }

    async fn add_role(&self, mut role: Role) -> anyhow::Result<Role> {
        let mut t = self.tables.write().await;
        if t.roles
            .iter()
            .any(|r| r.id == role.id || eq_ci(&r.name, &role.name))
        {
            return Err(Conflict("role").into());
        }
        role.permissions.sort();
        role.permissions.dedup();
        t.roles.push(role.clone());
        Ok(role)
    }

    async fn update_role(&self, mut role: Role) -> anyhow::Result<Option<Role>> {
        let mut t = self.tables.write().await;
        if t.roles
            .iter()
            .any(|r| r.id != role.id && eq_ci(&r.name, &role.name))
        {
            return Err(Conflict("role").into());
        }
        let Some(stored) = t.roles.iter_mut().find(|r| r.id == role.id) else {
            return Ok(None);
        };
        role.permissions.sort();
        role.permissions.dedup();
        stored.name = role.name;
        stored.permissions = role.permissions;
        stored.audit.modified_at = role.audit.modified_at;
        stored.audit.modified_by = role.audit.modified_by;
        stored.audit.owner = role.audit.owner;
        Ok(Some(stored.clone()))
    }

    async fn delete_role(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut t = self.tables.write().await;
        let before = t.roles.len();
        t.roles.retain(|r| r.id != id);
        if t.roles.len() == before {
            return Ok(false);
        }
        for user in t.users.iter_mut().filter(|u| u.role == Some(id)) {
            user.role = None;
        }
        Ok(true)
    }

    async fn find_permission_names_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<String>> {
        let t = self.tables.read().await;
        let Some(role_id) = t.users.iter().find(|u| u.id == user_id).and_then(|u| u.role) else {
            return Ok(Vec::new());
        };
        let Some(role) = t.roles.iter().find(|r| r.id == role_id) else {
            return Ok(Vec::new());
        };
        let mut names: Vec<String> = t
            .named
            .get(&Collection::Permissions)
            .into_iter()
            .flatten()
            .filter(|p| role.permissions.contains(&p.id))
            .map(|p| p.name.clone())
            .collect();
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn find_all_tokens(&self, kind: TokenKind) -> anyhow::Result<Vec<Token>> {
        let t = self.tables.read().await;
        Ok(t.tokens.get(&kind).cloned().unwrap_or_default())
    }

    async fn find_token(&self, kind: TokenKind, id: Uuid) -> anyhow::Result<Option<Token>> {
        let t = self.tables.read().await;
        Ok(t.tokens
            .get(&kind)
            .and_then(|rows| rows.iter().find(|tok| tok.id == id).cloned()))
    }

    async fn find_token_by_user(
        &self,
        kind: TokenKind,
        user_id: Uuid,
    ) -> anyhow::Result<Option<Token>> {
        let t = self.tables.read().await;
        Ok(t.tokens
            .get(&kind)
            .and_then(|rows| rows.iter().find(|tok| tok.user_id == user_id).cloned()))
    }

    async fn save_token(&self, kind: TokenKind, token: Token) -> anyhow::Result<Token> {
        #[cfg(test)]
        if self
            .fail_token_writes
            .load(std::sync::atomic::Ordering::SeqCst)
        {
            anyhow::bail!("{} writes disabled", kind.noun());
        }
        let mut t = self.tables.write().await;
        if !t.users.iter().any(|u| u.id == token.user_id) {
            anyhow::bail!("{} references unknown user {}", kind.noun(), token.user_id);
        }
        let rows = t.tokens.entry(kind).or_default();
        if let Some(stored) = rows.iter_mut().find(|tok| tok.id == token.id) {
            stored.code = token.code;
            stored.expiry_date = token.expiry_date;
            stored.audit.modified_at = token.audit.modified_at;
            stored.audit.modified_by = token.audit.modified_by;
            return Ok(stored.clone());
        }
        if rows.iter().any(|tok| tok.user_id == token.user_id) {
            return Err(Conflict(kind.noun()).into());
        }
        rows.push(token.clone());
        Ok(token)
    }

    async fn delete_token(&self, kind: TokenKind, id: Uuid) -> anyhow::Result<bool> {
        let mut t = self.tables.write().await;
        let rows = t.tokens.entry(kind).or_default();
        let before = rows.len();
        rows.retain(|tok| tok.id != id);
        Ok(rows.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn user_uniqueness_ignores_case() {
        let store = MemoryStore::default();
        store.add_user(User::new("Foo", "foo@email.com")).await.unwrap();

        let dup = store.add_user(User::new("FOO", "other@email.com")).await;
        assert!(dup.unwrap_err().downcast_ref::<Conflict>().is_some());
        assert!(store.user_exists(None, "foo", "").await.unwrap());
        assert!(store.user_exists(None, "", "FOO@EMAIL.COM").await.unwrap());
        assert!(!store.user_exists(Some(Uuid::new_v4()), "bar", "bar@email.com").await.unwrap());
    }

    #[tokio::test]
    async fn exists_matches_on_taken_id() {
        let store = MemoryStore::default();
        let user = store.add_user(User::new("Foo", "foo@email.com")).await.unwrap();
        assert!(store.user_exists(Some(user.id), "Bar", "bar@email.com").await.unwrap());

        let foo = store
            .add_named(Collection::Types, NamedEntity::new("Foo"))
            .await
            .unwrap();
        assert!(store.named_exists(Collection::Types, Some(foo.id), "Bar").await.unwrap());
        assert!(store.named_exists(Collection::Types, None, "FOO").await.unwrap());
        assert!(!store.named_exists(Collection::Types, Some(Uuid::new_v4()), "Bar").await.unwrap());
        // ids are scoped to their collection
        assert!(!store.named_exists(Collection::Permissions, Some(foo.id), "Bar").await.unwrap());

        let role = store.add_role(Role::new("Reader", vec![])).await.unwrap();
        assert!(store.role_exists(Some(role.id), "Writer").await.unwrap());
        assert!(!store.role_exists(Some(Uuid::new_v4()), "Writer").await.unwrap());
    }

    #[tokio::test]
    async fn name_lookup_needs_exactly_one_match() {
        let store = MemoryStore::default();
        for name in ["Foo1", "Foo2"] {
            store
                .add_named(Collection::Types, NamedEntity::new(name))
                .await
                .unwrap();
        }
        assert!(store.find_named_by_name(Collection::Types, "Foo").await.unwrap().is_none());
        assert!(store.find_named_by_name(Collection::Types, "").await.unwrap().is_none());
        assert!(store.find_named_by_name(Collection::Types, "foo1").await.unwrap().is_some());
        assert_eq!(
            store.find_all_named_containing(Collection::Types, "FOO").await.unwrap().len(),
            2
        );
    }

    #[tokio::test]
    async fn roles_search_ignores_case() {
        let store = MemoryStore::default();
        for name in ["Administrator", "User", "Auditor"] {
            store.add_role(Role::new(name, vec![])).await.unwrap();
        }
        let found = store.find_roles_containing("ADMIN").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Administrator");
        assert_eq!(store.find_roles_containing("").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn username_or_email_lookup_skips_empty_arguments() {
        let store = MemoryStore::default();
        let foo = store.add_user(User::new("Foo", "foo@email.com")).await.unwrap();

        assert!(store.find_user_by_username_or_email("", "").await.unwrap().is_none());
        let by_name = store.find_user_by_username_or_email("foo", "").await.unwrap();
        assert_eq!(by_name.map(|u| u.id), Some(foo.id));
        let by_email = store.find_user_by_username_or_email("", "Foo@Email.com").await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(foo.id));
    }

    #[tokio::test]
    async fn update_keeps_creation_audit() {
        let store = MemoryStore::default();
        let creator = Uuid::new_v4();
        let mut user = User::new("Foo", "foo@email.com");
        user.audit.created_by = Some(creator);
        let user = store.add_user(user).await.unwrap();

        let mut changed = user.clone();
        changed.email = "new@email.com".into();
        changed.audit.created_by = None;
        changed.audit.touch(None);
        let updated = store.update_user(changed).await.unwrap().unwrap();

        assert_eq!(updated.email, "new@email.com");
        assert_eq!(updated.audit.created_by, Some(creator));
        assert_eq!(updated.audit.created_at, user.audit.created_at);
        assert!(updated.audit.modified_at.is_some());
    }

    #[tokio::test]
    async fn deleting_user_cascades_to_tokens() {
        let store = MemoryStore::default();
        let user = store.add_user(User::new("Foo", "foo@email.com")).await.unwrap();
        let token = Token {
            id: Uuid::new_v4(),
            user_id: user.id,
            code: "code".into(),
            expiry_date: audit::now(),
            audit: audit::Audit::created(None, Some(user.id)),
        };
        store.save_token(TokenKind::Verification, token).await.unwrap();

        assert!(store.delete_user(user.id).await.unwrap());
        assert!(store.find_all_tokens(TokenKind::Verification).await.unwrap().is_empty());
        assert!(!store.delete_user(user.id).await.unwrap());
    }

    #[tokio::test]
    async fn tokens_require_existing_user() {
        let store = MemoryStore::default();
        let token = Token {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            code: "code".into(),
            expiry_date: audit::now(),
            audit: audit::Audit::created(None, None),
        };
        assert!(store.save_token(TokenKind::PasswordReset, token).await.is_err());
    }

    #[tokio::test]
    async fn permission_names_follow_role() {
        let store = MemoryStore::default();
        let read = store
            .add_named(Collection::Permissions, NamedEntity::new("Types_READ"))
            .await
            .unwrap();
        store
            .add_named(Collection::Permissions, NamedEntity::new("Types_DELETE"))
            .await
            .unwrap();
        let role = store.add_role(Role::new("Reader", vec![read.id])).await.unwrap();
        let mut user = User::new("Foo", "foo@email.com");
        user.role = Some(role.id);
        let user = store.add_user(user).await.unwrap();

        let names = store.find_permission_names_for_user(user.id).await.unwrap();
        assert_eq!(names, vec!["Types_READ".to_string()]);

        assert!(store.delete_role(role.id).await.unwrap());
        assert!(store.find_permission_names_for_user(user.id).await.unwrap().is_empty());
        assert_eq!(store.find_user(user.id).await.unwrap().unwrap().role, None);
    }
}
