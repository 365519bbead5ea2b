use crate::parser::entries::{candidate_text, group_entries, non_empty_lines, strip_bullet};
use crate::parser::section::SectionKind;
use crate::parser::starts_like_item;
use crate::record::Achievement;

pub fn extract_achievements(text: &str) -> Vec<Achievement> {
    let (source, mode) = candidate_text(text, SectionKind::Achievements);
    let lines = non_empty_lines(source);

    group_entries(&lines, mode, starts_like_item)
        .iter()
        .map(|lines| parse_achievement(lines))
        .filter(|achievement| !achievement.title.is_empty())
        .collect()
}

fn parse_achievement(lines: &[&str]) -> Achievement {
    let first_line = lines.first().map(|l| strip_bullet(l)).unwrap_or("");

    match first_line.split_once(':') {
        Some((title, tail)) => {
            let mut description = tail.trim().to_string();
            for line in lines.iter().skip(1) {
                description.push('\n');
                description.push_str(line);
            }
            Achievement {
                title: title.trim().to_string(),
                description: description.trim().to_string(),
            }
        }
        None => Achievement {
            title: first_line.to_string(),
            description: lines.join("\n"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_before_colon() {
        let text = "Awards\n1. Hackathon Winner: first place out of 40 teams\nsponsored by Acme\n2. Dean's List";
        let achievements = extract_achievements(text);

        assert_eq!(achievements.len(), 2);
        assert_eq!(achievements[0].title, "Hackathon Winner");
        assert_eq!(
            achievements[0].description,
            "first place out of 40 teams\nsponsored by Acme"
        );
        assert_eq!(achievements[1].title, "Dean's List");
        assert_eq!(achievements[1].description, "2. Dean's List");
    }

    #[test]
    fn test_empty_without_items() {
        assert!(extract_achievements("").is_empty());
    }
}
