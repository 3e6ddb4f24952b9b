//! Built-in word corpus, used by the word service and for fully offline play.

use super::*;
use rand::seq::IndexedRandom;

/// A themed group of word pairs
#[derive(Debug, Clone, Copy)]
pub struct Category {
    pub name: &'static str,
    pub pairs: &'static [(&'static str, &'static str)],
}

const CATEGORIES_EN: &[Category] = &[
    Category {
        name: "General",
        pairs: &[
            ("Hospital", "Pharmacy"),
            ("Beach", "Pool"),
            ("Cinema", "Theater"),
            ("Library", "Bookstore"),
            ("Airport", "Station"),
            ("Guitar", "Violin"),
            ("Coffee", "Tea"),
            ("Sun", "Moon"),
            ("Laptop", "Tablet"),
            ("Pen", "Pencil"),
            ("Gold", "Silver"),
            ("Watch", "Bracelet"),
        ],
    },
    Category {
        name: "Animals",
        pairs: &[
            ("Dog", "Wolf"),
            ("Cat", "Tiger"),
            ("Horse", "Zebra"),
            ("Shark", "Dolphin"),
            ("Eagle", "Falcon"),
            ("Snake", "Lizard"),
            ("Bee", "Wasp"),
            ("Frog", "Toad"),
            ("Whale", "Orca"),
            ("Rabbit", "Hare"),
        ],
    },
    Category {
        name: "Food",
        pairs: &[
            ("Pizza", "Burger"),
            ("Sushi", "Sashimi"),
            ("Tacos", "Burritos"),
            ("Ice Cream", "Yogurt"),
            ("Pasta", "Noodles"),
            ("Cake", "Pie"),
            ("Cheese", "Butter"),
            ("Apple", "Pear"),
            ("Chocolate", "Vanilla"),
            ("Salad", "Soup"),
        ],
    },
    Category {
        name: "Places",
        pairs: &[
            ("Paris", "Rome"),
            ("New York", "Chicago"),
            ("Tokyo", "Seoul"),
            ("School", "University"),
            ("Hotel", "Motel"),
            ("Zoo", "Aquarium"),
            ("Mountain", "Hill"),
            ("Forest", "Jungle"),
            ("Bridge", "Tunnel"),
            ("Castle", "Palace"),
        ],
    },
];

const CATEGORIES_ES: &[Category] = &[
    Category {
        name: "General",
        pairs: &[
            ("Hospital", "Farmacia"),
            ("Playa", "Piscina"),
            ("Cine", "Teatro"),
            ("Biblioteca", "Librería"),
            ("Aeropuerto", "Estación"),
            ("Guitarra", "Violín"),
            ("Café", "Té"),
            ("Sol", "Luna"),
            ("Portátil", "Tableta"),
            ("Bolígrafo", "Lápiz"),
            ("Oro", "Plata"),
            ("Reloj", "Pulsera"),
        ],
    },
    Category {
        name: "Animales",
        pairs: &[
            ("Perro", "Lobo"),
            ("Gato", "Tigre"),
            ("Caballo", "Cebra"),
            ("Tiburón", "Delfín"),
            ("Águila", "Halcón"),
            ("Serpiente", "Lagarto"),
            ("Abeja", "Avispa"),
            ("Rana", "Sapo"),
            ("Ballena", "Orca"),
            ("Conejo", "Liebre"),
        ],
    },
    Category {
        name: "Comida",
        pairs: &[
            ("Pizza", "Hamburguesa"),
            ("Sushi", "Sashimi"),
            ("Tacos", "Burritos"),
            ("Helado", "Yogur"),
            ("Pasta", "Fideos"),
            ("Pastel", "Tarta"),
            ("Queso", "Crema"),
            ("Manzana", "Pera"),
            ("Chocolate", "Vainilla"),
            ("Ensalada", "Sopa"),
        ],
    },
    Category {
        name: "Lugares",
        pairs: &[
            ("París", "Roma"),
            ("Nueva York", "Chicago"),
            ("Tokio", "Seúl"),
            ("Escuela", "Universidad"),
            ("Hotel", "Motel"),
            ("Zoológico", "Acuario"),
            ("Montaña", "Colina"),
            ("Bosque", "Selva"),
            ("Puente", "Túnel"),
            ("Castillo", "Palacio"),
        ],
    },
];

fn categories_for(lang: &str) -> &'static [Category] {
    match lang {
        "es" => CATEGORIES_ES,
        _ => CATEGORIES_EN,
    }
}

/// Look up a category by name, falling back to the language's first category
pub fn find_category(name: &str, lang: &str) -> Category {
    let categories = categories_for(lang);
    categories
        .iter()
        .find(|c| c.name == name)
        .copied()
        .unwrap_or(categories[0])
}

pub fn category_names(lang: &str) -> Vec<&'static str> {
    categories_for(lang).iter().map(|c| c.name).collect()
}

impl Category {
    pub fn random_pair(&self) -> Option<WordPair> {
        self.pairs
            .choose(&mut rand::rng())
            .map(|(real, trap)| WordPair::new(*real, *trap))
    }
}

/// Word supply drawing from the built-in corpus without any I/O
#[derive(Debug, Clone, Copy, Default)]
pub struct DictionarySupply;

#[async_trait]
impl WordSupply for DictionarySupply {
    async fn fetch_pair(&self, category: &str, lang: &str) -> WordResult<WordPair> {
        find_category(category, lang)
            .random_pair()
            .ok_or_else(|| WordError::Empty {
                category: category.to_string(),
                lang: lang.to_string(),
            })
    }

    fn name(&self) -> &str {
        "dictionary"
    }
}
