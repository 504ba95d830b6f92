use serde::{Deserialize, Serialize};

/// A dish as read off the menu image, before it has a picture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dish {
    pub name: String,
    pub price: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuImage {
    pub b64_json: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub name: String,
    pub price: String,
    pub description: String,
    pub menu_image: MenuImage,
}

impl MenuItem {
    pub fn from_dish(dish: Dish, b64_json: String) -> Self {
        Self {
            name: dish.name,
            price: dish.price,
            description: dish.description,
            menu_image: MenuImage { b64_json },
        }
    }
}

/// Ordered list of enriched items, in the order the vision model extracted them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MenuCollection {
    pub items: Vec<MenuItem>,
}

impl MenuCollection {
    pub fn new(items: Vec<MenuItem>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 依名稱做不分大小寫的子字串過濾；空字串回傳全部
    pub fn filter_by_name(&self, term: &str) -> Vec<&MenuItem> {
        let needle = term.trim().to_lowercase();
        self.items
            .iter()
            .filter(|item| item.name.to_lowercase().contains(&needle))
            .collect()
    }
}
