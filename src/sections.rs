//! Splits a store-ordered note list into "Pinned" and "Others" sections.

use crate::models::{Item, Note};

pub const PINNED_HEADER: &str = "Pinned";
pub const OTHERS_HEADER: &str = "Others";

/// Input must already be ordered pinned-first. A list whose first note is
/// not pinned gets no headers at all.
pub fn section(notes: Vec<Note>) -> Vec<Item> {
    let starts_pinned = notes.first().map_or(false, |note| note.pinned);
    if !starts_pinned {
        return notes.into_iter().map(Item::Note).collect();
    }

    let first_unpinned = notes.iter().position(|note| !note.pinned);
    let mut items = Vec::with_capacity(notes.len() + 2);
    items.push(Item::Header(PINNED_HEADER.to_string()));
    for (index, note) in notes.into_iter().enumerate() {
        if Some(index) == first_unpinned {
            items.push(Item::Header(OTHERS_HEADER.to_string()));
        }
        items.push(Item::Note(note));
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notes(pinned: usize, total: usize) -> Vec<Note> {
        (0..total)
            .map(|i| {
                let mut note = Note::plain(format!("n{}", i), "");
                note.id = i as i64 + 1;
                note.pinned = i < pinned;
                note
            })
            .collect()
    }

    fn header(item: &Item) -> Option<&str> {
        match item {
            Item::Header(text) => Some(text),
            Item::Note(_) => None,
        }
    }

    #[test]
    fn test_empty_list_stays_empty() {
        assert!(section(vec![]).is_empty());
    }

    #[test]
    fn test_headers_for_every_pinned_prefix() {
        let total = 4;
        for k in 0..=total {
            let items = section(notes(k, total));

            let headers: Vec<_> = items.iter().filter_map(header).collect();
            let mut expected = Vec::new();
            if k > 0 {
                expected.push(PINNED_HEADER);
                assert_eq!(header(&items[0]), Some(PINNED_HEADER));
            }
            if k > 0 && k < total {
                expected.push(OTHERS_HEADER);
                assert_eq!(header(&items[k + 1]), Some(OTHERS_HEADER));
            }
            assert_eq!(headers, expected, "k = {}", k);

            let ids: Vec<_> = items.iter().filter_map(Item::as_note).map(|n| n.id).collect();
            assert_eq!(ids, vec![1, 2, 3, 4], "k = {}", k);
        }
    }

    #[test]
    fn test_unpinned_only_list_has_no_others_header() {
        let items = section(notes(0, 2));
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.as_note().is_some()));
    }
}
