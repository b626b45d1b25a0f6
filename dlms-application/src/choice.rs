//! Named choice and enumeration values

/// A `u8`-coded protocol enumeration with wire names
pub trait NamedValue: Copy {
    fn from_value(value: u8) -> Option<Self>;

    fn label(self) -> &'static str;
}

/// `"name (value)"`, or `"Unknown (value)"` when `value` is not defined for `T`
pub fn describe<T: NamedValue>(value: u8) -> String {
    match T::from_value(value) {
        Some(named) => format!("{} ({})", named.label(), value),
        None => format!("Unknown ({})", value),
    }
}

/// Define a `u8`-coded enumeration with its wire names
///
/// Generates `from_u8`, `value`, `name`, `Display` and [`NamedValue`].
macro_rules! named_values {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident = $value:literal => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant = $value),+
        }

        impl $name {
            pub fn from_u8(value: u8) -> Option<Self> {
                match value {
                    $($value => Some(Self::$variant),)+
                    _ => None,
                }
            }

            pub fn value(self) -> u8 {
                self as u8
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl $crate::choice::NamedValue for $name {
            fn from_value(value: u8) -> Option<Self> {
                Self::from_u8(value)
            }

            fn label(self) -> &'static str {
                self.name()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

pub(crate) use named_values;

/// `get-request-normal` -> `Get-Request-Normal`
pub fn title_case(name: &str) -> String {
    name.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}
