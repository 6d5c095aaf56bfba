//! XML encoding of backups and of single notes.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeSet;
use std::io::{BufRead, Write};
use std::str::FromStr;

use super::tags;
use super::{Backup, BackupError};
use crate::models::{Folder, ListItem, Note, NoteType, Span, SpanStyle};

// ==================== ENCODE ====================

pub fn write_backup<W: Write>(backup: &Backup, sink: W) -> Result<(), BackupError> {
    let mut writer = Writer::new(sink);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    start(&mut writer, tags::ROOT)?;

    for (tag, notes) in [
        (tags::ACTIVE_NOTES, &backup.active),
        (tags::DELETED_NOTES, &backup.deleted),
        (tags::ARCHIVED_NOTES, &backup.archived),
    ] {
        start(&mut writer, tag)?;
        for note in notes {
            write_note_element(&mut writer, note)?;
        }
        end(&mut writer, tag)?;
    }

    start(&mut writer, tags::LABELS)?;
    for label in &backup.labels {
        leaf(&mut writer, tags::LABEL, label)?;
    }
    end(&mut writer, tags::LABELS)?;

    end(&mut writer, tags::ROOT)?;
    writer.into_inner().flush()?;
    Ok(())
}

/// Standalone document holding one note; the legacy per-note file format.
pub fn write_note<W: Write>(note: &Note, sink: W) -> Result<(), BackupError> {
    let mut writer = Writer::new(sink);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write_note_element(&mut writer, note)?;
    writer.into_inner().flush()?;
    Ok(())
}

fn write_note_element<W: Write>(writer: &mut Writer<W>, note: &Note) -> Result<(), BackupError> {
    let tag = note_tag(note.note_type);
    start(writer, tag)?;
    leaf(writer, tags::DATE_CREATED, &note.timestamp.to_string())?;
    leaf(writer, tags::PINNED, bool_text(note.pinned))?;
    leaf(writer, tags::TITLE, &note.title)?;

    match note.note_type {
        NoteType::PlainNote => {
            leaf(writer, tags::BODY, &note.body)?;
            for span in &note.spans {
                start(writer, tags::SPAN)?;
                leaf(writer, tags::START, &span.start.to_string())?;
                leaf(writer, tags::END, &span.end.to_string())?;
                leaf(writer, tags::STYLE, span.style.as_str())?;
                end(writer, tags::SPAN)?;
            }
        }
        NoteType::ChecklistNote => {
            for item in &note.items {
                start(writer, tags::ITEM)?;
                leaf(writer, tags::TEXT, &item.body)?;
                leaf(writer, tags::CHECKED, bool_text(item.checked))?;
                end(writer, tags::ITEM)?;
            }
        }
        NoteType::PhoneNumberNote => leaf(writer, tags::BODY, &note.body)?,
    }

    for label in &note.labels {
        leaf(writer, tags::LABEL, label)?;
    }
    end(writer, tag)
}

fn start<W: Write>(writer: &mut Writer<W>, tag: &str) -> Result<(), BackupError> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    Ok(())
}

fn end<W: Write>(writer: &mut Writer<W>, tag: &str) -> Result<(), BackupError> {
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn leaf<W: Write>(writer: &mut Writer<W>, tag: &str, text: &str) -> Result<(), BackupError> {
    start(writer, tag)?;
    if !text.is_empty() {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }
    end(writer, tag)
}

fn note_tag(note_type: NoteType) -> &'static str {
    match note_type {
        NoteType::PlainNote => tags::PLAIN_NOTE,
        NoteType::ChecklistNote => tags::CHECKLIST_NOTE,
        NoteType::PhoneNumberNote => tags::PHONE_NUMBER_NOTE,
    }
}

fn bool_text(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

// ==================== DECODE ====================

/// Parsed element; text of container elements is whitespace and ignored.
#[derive(Debug, Default)]
struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

fn parse_tree<R: BufRead>(source: R) -> Result<Element, BackupError> {
    let mut reader = Reader::from_reader(source);
    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => stack.push(Element {
                name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                ..Element::default()
            }),
            Event::Empty(ref e) => {
                let element = Element {
                    name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                    ..Element::default()
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::Text(ref e) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&e.unescape()?);
                }
            }
            Event::CData(ref e) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(e));
                }
            }
            Event::End(_) => {
                let element = stack.pop().ok_or(BackupError::Truncated)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(BackupError::Truncated);
    }
    root.ok_or(BackupError::Truncated)
}

pub fn read_backup<R: BufRead>(source: R) -> Result<Backup, BackupError> {
    let root = parse_tree(source)?;
    if root.name != tags::ROOT {
        return Err(BackupError::UnexpectedElement {
            parent: "document".to_string(),
            name: root.name,
        });
    }

    let mut backup = Backup::default();
    for section in root.children {
        match section.name.as_str() {
            tags::ACTIVE_NOTES => backup.active = read_section(section, Folder::Active)?,
            tags::DELETED_NOTES => backup.deleted = read_section(section, Folder::Deleted)?,
            tags::ARCHIVED_NOTES => backup.archived = read_section(section, Folder::Archived)?,
            tags::LABELS => {
                backup.labels.extend(
                    section
                        .children
                        .into_iter()
                        .filter(|child| child.name == tags::LABEL)
                        .map(|child| child.text),
                );
            }
            _ => {}
        }
    }
    Ok(backup)
}

/// Read a standalone note document, placing the note in `folder`.
pub fn read_note<R: BufRead>(source: R, folder: Folder) -> Result<Note, BackupError> {
    read_note_element(parse_tree(source)?, folder)
}

fn read_section(section: Element, folder: Folder) -> Result<Vec<Note>, BackupError> {
    section
        .children
        .into_iter()
        .map(|element| read_note_element(element, folder))
        .collect()
}

fn read_note_element(element: Element, folder: Folder) -> Result<Note, BackupError> {
    let note_type = match element.name.as_str() {
        tags::PLAIN_NOTE => NoteType::PlainNote,
        tags::CHECKLIST_NOTE => NoteType::ChecklistNote,
        tags::PHONE_NUMBER_NOTE => NoteType::PhoneNumberNote,
        _ => {
            return Err(BackupError::UnexpectedElement {
                parent: folder.as_str().to_string(),
                name: element.name,
            })
        }
    };

    let mut timestamp = None;
    let mut note = Note {
        id: 0,
        folder,
        note_type,
        title: String::new(),
        body: String::new(),
        items: Vec::new(),
        spans: Vec::new(),
        labels: BTreeSet::new(),
        pinned: false,
        timestamp: 0,
    };

    for child in element.children {
        match child.name.as_str() {
            tags::DATE_CREATED => timestamp = Some(parse_value(tags::DATE_CREATED, &child.text)?),
            tags::PINNED => note.pinned = parse_bool(tags::PINNED, &child.text)?,
            tags::TITLE => note.title = child.text,
            tags::BODY => note.body = child.text,
            tags::SPAN => note.spans.push(read_span(child)?),
            tags::ITEM => note.items.push(read_item(child)?),
            tags::LABEL => {
                note.labels.insert(child.text);
            }
            _ => {}
        }
    }

    note.timestamp = timestamp.ok_or(BackupError::MissingTag(tags::DATE_CREATED))?;
    Ok(note)
}

fn read_span(element: Element) -> Result<Span, BackupError> {
    let mut start = None;
    let mut end = None;
    let mut style = None;

    for child in element.children {
        match child.name.as_str() {
            tags::START => start = Some(parse_value(tags::START, &child.text)?),
            tags::END => end = Some(parse_value(tags::END, &child.text)?),
            tags::STYLE => {
                style = Some(SpanStyle::parse(child.text.trim()).ok_or_else(|| {
                    BackupError::InvalidValue {
                        tag: tags::STYLE,
                        value: child.text.clone(),
                    }
                })?)
            }
            _ => {}
        }
    }

    Ok(Span {
        start: start.ok_or(BackupError::MissingTag(tags::START))?,
        end: end.ok_or(BackupError::MissingTag(tags::END))?,
        style: style.ok_or(BackupError::MissingTag(tags::STYLE))?,
    })
}

fn read_item(element: Element) -> Result<ListItem, BackupError> {
    let mut item = ListItem::default();
    for child in element.children {
        match child.name.as_str() {
            tags::TEXT => item.body = child.text,
            tags::CHECKED => item.checked = parse_bool(tags::CHECKED, &child.text)?,
            _ => {}
        }
    }
    Ok(item)
}

fn parse_value<T: FromStr>(tag: &'static str, text: &str) -> Result<T, BackupError> {
    text.trim().parse().map_err(|_| BackupError::InvalidValue {
        tag,
        value: text.to_string(),
    })
}

fn parse_bool(tag: &'static str, text: &str) -> Result<bool, BackupError> {
    match text.trim() {
        "true" => Ok(true),
        "false" | "" => Ok(false),
        _ => Err(BackupError::InvalidValue {
            tag,
            value: text.to_string(),
        }),
    }
}
