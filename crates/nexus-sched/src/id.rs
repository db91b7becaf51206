//! Opaque identifiers exchanged with the master and the slaves.
//! All of them are short strings minted by a remote peer (or, for
//! [FtId], by the reliable messaging layer) and carry no structure the
//! framework is allowed to rely on.

macro_rules! define_id_type {
    ($name:ident) => {
        #[derive(Debug, Default, Clone, Eq, PartialEq, Hash)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id_type!(FrameworkId);
define_id_type!(OfferId);
define_id_type!(SlaveId);
define_id_type!(TaskId);
define_id_type!(FtId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_round_trip() {
        let id = FrameworkId::from("f_7");
        assert_eq!(id.as_str(), "f_7");
        assert_eq!(id.to_string(), "f_7");
        assert_eq!(String::from(id), "f_7");
    }

    #[test]
    fn test_default_id_is_empty() {
        assert!(FrameworkId::default().is_empty());
        assert!(!TaskId::from("t_1").is_empty());
    }
}
