/// A well-known meme base image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemeTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub url: &'static str,
}

/// Built-in template catalog, in display order.
pub const MEME_TEMPLATES: &[MemeTemplate] = &[
    MemeTemplate { id: "distracted-bf", name: "Distracted Boyfriend", url: "https://i.imgflip.com/1ur9b0.jpg" },
    MemeTemplate { id: "drake", name: "Drake Hotline Bling", url: "https://i.imgflip.com/30b1gx.jpg" },
    MemeTemplate { id: "disaster-girl", name: "Disaster Girl", url: "https://i.imgflip.com/23ls.jpg" },
    MemeTemplate { id: "success-kid", name: "Success Kid", url: "https://i.imgflip.com/1b42wl.jpg" },
    MemeTemplate { id: "change-my-mind", name: "Change My Mind", url: "https://i.imgflip.com/24y43o.jpg" },
];

pub fn find_template(id: &str) -> Option<&'static MemeTemplate> {
    MEME_TEMPLATES.iter().find(|t| t.id.eq_ignore_ascii_case(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        for (i, a) in MEME_TEMPLATES.iter().enumerate() {
            assert!(MEME_TEMPLATES[i + 1..].iter().all(|b| b.id != a.id));
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(find_template("Drake").map(|t| t.name), Some("Drake Hotline Bling"));
        assert!(find_template("doge").is_none());
    }
}
