use serde::{Deserialize, Serialize};

/// Declares the category enum from one variant/tag list. The tag is both the
/// serde name and the value stored in the `restaurants.category` column.
macro_rules! categories {
    ($($variant:ident => $tag:literal,)+) => {
        /// Closed set of restaurant categories. `Unknown` absorbs every label
        /// the table below does not list.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum Category {
            $(#[serde(rename = $tag)] $variant,)+
        }

        impl Category {
            pub const ALL: &'static [Category] = &[$(Category::$variant,)+];

            pub fn as_tag(&self) -> &'static str {
                match self {
                    $(Category::$variant => $tag,)+
                }
            }

            /// Inverse of [`Category::as_tag`]; unrecognized tags read back as `Unknown`.
            pub fn from_tag(tag: &str) -> Self {
                match tag {
                    $($tag => Category::$variant,)+
                    _ => Category::Unknown,
                }
            }
        }
    };
}

categories! {
    Korean => "KOREAN",
    Chinese => "CHINESE",
    Japanese => "JAPANESE",
    Western => "WESTERN",
    Snack => "SNACK",
    Chicken => "CHICKEN",
    Pub => "PUB",
    FastFood => "FAST_FOOD",
    Buffet => "BUFFET",
    Cafe => "CAFE",
    Grill => "GRILL",
    Seafood => "SEAFOOD",
    Noodle => "NOODLE",
    Soup => "SOUP",
    Foreign => "FOREIGN",
    FamilyRestaurant => "FAMILY_RESTAURANT",
    Etc => "ETC",
    Unknown => "UNKNOWN",
}

const LABELS: &[(&str, Category)] = &[
    ("한식", Category::Korean),
    ("중국식", Category::Chinese),
    ("일식", Category::Japanese),
    ("경양식", Category::Western),
    ("분식", Category::Snack),
    ("김밥(도시락)", Category::Snack),
    ("호프/통닭", Category::Chicken),
    ("통닭(치킨)", Category::Chicken),
    ("정종/대포집/소주방", Category::Pub),
    ("감성주점", Category::Pub),
    ("패스트푸드", Category::FastFood),
    ("뷔페식", Category::Buffet),
    ("까페", Category::Cafe),
    ("커피숍", Category::Cafe),
    ("전통찻집", Category::Cafe),
    ("키즈카페", Category::Cafe),
    ("라이브카페", Category::Cafe),
    ("식육(숯불구이)", Category::Grill),
    ("횟집", Category::Seafood),
    ("복어취급", Category::Seafood),
    ("냉면집", Category::Noodle),
    ("탕류(보신용)", Category::Soup),
    ("외국음식전문점(인도,태국등)", Category::Foreign),
    ("패밀리레스트랑", Category::FamilyRestaurant),
    ("패밀리레스토랑", Category::FamilyRestaurant),
    ("기타", Category::Etc),
];

impl Category {
    pub fn normalize(text: &str) -> Self {
        let label = text.trim();
        LABELS
            .iter()
            .find(|(known, _)| *known == label)
            .map(|(_, category)| *category)
            .unwrap_or(Category::Unknown)
    }
}
