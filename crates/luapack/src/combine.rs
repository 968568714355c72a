pub trait Combine {
    /// Combine two values, preferring the values in `self`.
    ///
    /// The logic follows that of Cargo's `config.toml`:
    ///
    /// > If a key is specified in multiple config files, the values will get merged together.
    /// > Numbers, strings, and booleans will use the value in the deeper config directory taking
    /// > precedence over ancestor directories, where the home directory is the lowest priority.
    /// > Arrays will be joined together with higher precedence items being placed later in the
    /// > merged array.
    ///
    /// ...with one exception: we place items with higher precedence earlier in the merged array,
    /// so dependency roots from the project are searched before those from the user config.
    #[must_use]
    fn combine(self, other: Self) -> Self;
}

macro_rules! impl_combine_or {
    ($name:ty) => {
        impl Combine for Option<$name> {
            fn combine(self, other: Option<$name>) -> Option<$name> {
                self.or(other)
            }
        }
    };
}

impl_combine_or!(String);
impl_combine_or!(bool);

impl<T: PartialEq> Combine for Option<Vec<T>> {
    /// Combine two vectors by extending the higher precedence vector (`self`) with the lower
    /// precedence vector (`other`), placing higher precedence items first and skipping
    /// duplicates.
    fn combine(self, other: Option<Vec<T>>) -> Option<Vec<T>> {
        match (self, other) {
            (Some(mut a), Some(b)) => {
                for item in b {
                    if !a.contains(&item) {
                        a.push(item);
                    }
                }
                Some(a)
            }
            (a, b) => a.or(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_scalars_prefer_self() {
        assert_eq!(Some(true).combine(Some(false)), Some(true));
        assert_eq!(None::<bool>.combine(Some(false)), Some(false));
        assert_eq!(
            Some("lua".to_owned()).combine(Some("luau".to_owned())),
            Some("lua".to_owned())
        );
        assert_eq!(None::<bool>.combine(None), None);
    }

    #[test]
    fn test_vectors_join_with_self_first() {
        let project = Some(vec![PathBuf::from("lua_modules"), PathBuf::from("node_modules")]);
        let user = Some(vec![PathBuf::from("node_modules"), PathBuf::from("vendor")]);
        assert_eq!(
            project.combine(user),
            Some(vec![
                PathBuf::from("lua_modules"),
                PathBuf::from("node_modules"),
                PathBuf::from("vendor"),
            ])
        );
    }
}
