use sha2::{Digest, Sha256};

use crate::domain::user::User;

pub fn password_digest(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    encode_hex(digest.as_slice())
}

/// Checks credentials against the fixed user table. Unknown usernames and
/// wrong passwords are indistinguishable to the caller.
pub fn authenticate<'a>(users: &'a [User], username: &str, password: &str) -> Option<&'a User> {
    let candidate = users.iter().find(|user| user.username == username)?;
    let supplied = password_digest(password);
    constant_time_eq(supplied.as_bytes(), candidate.password_digest.as_bytes())
        .then_some(candidate)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }
    diff == 0
}

pub(crate) fn encode_hex(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        output.push_str(&format!("{byte:02x}"));
    }
    output
}

#[cfg(test)]
mod tests {
    use crate::auth::{authenticate, password_digest};
    use crate::domain::user::{User, UserRole};

    fn table() -> Vec<User> {
        vec![User {
            id: "user-1".to_string(),
            username: "sara.ahmed".to_string(),
            display_name: "Sara Ahmed".to_string(),
            phone: "36007788".to_string(),
            roles: vec![UserRole::JuniorAgent, UserRole::Supervisor],
            password_digest: password_digest("correct horse"),
        }]
    }

    #[test]
    fn valid_credentials_return_the_user() {
        let users = table();
        let user = authenticate(&users, "sara.ahmed", "correct horse").expect("should match");
        assert_eq!(user.id, "user-1");
    }

    #[test]
    fn wrong_password_and_unknown_user_both_fail() {
        let users = table();
        assert!(authenticate(&users, "sara.ahmed", "wrong").is_none());
        assert!(authenticate(&users, "nobody", "correct horse").is_none());
    }
}
