/// Generate `ALL`, `tag`, `from_tag`, `From<T> for String` and `TryFrom<String> for T`
/// for a closed, fieldless enum that is persisted by its upper-case tag.
///
/// `from_tag` is the lenient path used when loading saves (unknown tags yield `None`);
/// `TryFrom<String>` is the strict path used by serde. Add
/// `#[serde(into = "String", try_from = "String")]` to the enum to serialize it as its tag.
macro_rules! tagged_enum {
    ($name:ident { $($variant:ident => $tag:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn tag(self) -> &'static str {
                match self {
                    $($name::$variant => $tag,)+
                }
            }

            pub fn from_tag(tag: &str) -> Option<Self> {
                match tag {
                    $($tag => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl From<$name> for String {
            fn from(v: $name) -> Self {
                v.tag().to_string()
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                $name::from_tag(&s).ok_or_else(|| format!("unknown {}: {s}", stringify!($name)))
            }
        }
    };
}
