mod generate;
mod prompts;
mod tags;
mod token;

pub use generate::{gallery, generate_images, show_image};
pub use prompts::{compose_prompt, search_prompt_corpus};
pub use tags::{list_artists, list_d_groups, search_tag_catalog, TagSearchArgs};
pub use token::{clear_token, set_token, show_token};
