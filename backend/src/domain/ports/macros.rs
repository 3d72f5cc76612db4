//! Defines helper macros for generating domain port error enums.
//!
//! Every variant carries a single `String` detail field. The macro derives
//! `thiserror::Error`, adds one snake_case constructor per variant accepting
//! anything convertible into `String`, and a `message()` accessor.

macro_rules! define_port_error {
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident { $field:ident : String } => $display:literal
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($display)]
                $variant { $field: String },
            )*
        }

        impl $name {
            $(
                ::paste::paste! {
                    #[doc = concat!("Construct the `", stringify!($variant), "` variant.")]
                    pub fn [<$variant:snake>]($field: impl Into<String>) -> Self {
                        Self::$variant { $field: $field.into() }
                    }
                }
            )*

            /// Adapter-supplied detail, without the variant prefix.
            #[must_use]
            pub fn message(&self) -> &str {
                match self {
                    $( Self::$variant { $field } => $field.as_str(), )*
                }
            }
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use rstest::rstest;

    define_port_error! {
        pub enum FeedPortError {
            Unreachable { message: String } => "feed unreachable: {message}",
            PermissionDenied { reason: String } => "feed refused: {reason}",
        }
    }

    #[rstest]
    fn constructors_accept_str() {
        let err = FeedPortError::unreachable("socket closed");
        assert_eq!(err.to_string(), "feed unreachable: socket closed");
        assert_eq!(err.message(), "socket closed");
    }

    #[rstest]
    fn multi_word_variants_get_snake_constructors() {
        let err = FeedPortError::permission_denied(String::from("rules"));
        assert_eq!(err, FeedPortError::PermissionDenied { reason: "rules".into() });
        assert_eq!(err.to_string(), "feed refused: rules");
    }
}
