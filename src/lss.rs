//! LiveSplit `.lss` run files.
//!
//! Only the parts the timer works with are decoded. `<Metadata>`,
//! `<AutoSplitterSettings>`, segment icons and unknown `<Run>` children are
//! captured as raw XML and written back untouched.

use crate::model::{Attempt, ComparisonTime, HistoryEntry, RunDefinition, Segment};
use anyhow::{bail, Context, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};

const PERSONAL_BEST: &str = "Personal Best";
const DEFAULT_VERSION: &str = "1.7.0";

type XmlReader<'a> = Reader<&'a [u8]>;

fn tag_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

/// Everything between `e` and its closing tag, markup included, without unescaping.
fn raw_inner(reader: &mut XmlReader, e: &BytesStart) -> Result<String> {
    let name = e.name().as_ref().to_vec();
    let raw = reader
        .read_text(QName(&name))
        .with_context(|| format!("reading <{}>", tag_name(e)))?;
    Ok(raw.into_owned())
}

/// Text content of a leaf element.
fn leaf_text(reader: &mut XmlReader, e: &BytesStart) -> Result<String> {
    let raw = raw_inner(reader, e)?;
    let trimmed = raw.trim();
    if let Some(cdata) = trimmed
        .strip_prefix("<![CDATA[")
        .and_then(|rest| rest.strip_suffix("]]>"))
    {
        return Ok(cdata.to_string());
    }
    let text = quick_xml::escape::unescape(&raw)
        .with_context(|| format!("unescaping <{}>", tag_name(e)))?;
    Ok(text.into_owned())
}

fn skip_element(reader: &mut XmlReader, e: &BytesStart) -> Result<()> {
    let name = e.name().as_ref().to_vec();
    reader.read_to_end(QName(&name))?;
    Ok(())
}

fn attribute(e: &BytesStart, key: &str) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn flag(e: &BytesStart, key: &str) -> Result<bool> {
    Ok(attribute(e, key)?.is_some_and(|v| v.eq_ignore_ascii_case("true")))
}

fn id_attribute(e: &BytesStart) -> Result<i64> {
    let raw = attribute(e, "id")?.unwrap_or_default();
    raw.trim()
        .parse()
        .with_context(|| format!("invalid id {raw:?} on <{}>", tag_name(e)))
}

/// `(RealTime, GameTime)` children of a time container.
fn read_times(reader: &mut XmlReader, end: &[u8]) -> Result<(String, String)> {
    let mut real = String::new();
    let mut game = String::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"RealTime" => real = leaf_text(reader, &e)?,
                b"GameTime" => game = leaf_text(reader, &e)?,
                _ => skip_element(reader, &e)?,
            },
            Event::End(e) if e.name().as_ref() == end => return Ok((real, game)),
            Event::Eof => bail!("unexpected end of file in <{}>", String::from_utf8_lossy(end)),
            _ => {}
        }
    }
}

/// Decode a LiveSplit document.
pub fn parse(xml: &str) -> Result<RunDefinition> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"Run" => {
                let version = attribute(&e, "version")?;
                let mut def = read_run(&mut reader)?;
                def.format_version = version;
                return Ok(def);
            }
            Event::Start(e) => bail!("expected <Run>, found <{}>", tag_name(&e)),
            Event::Eof => bail!("no <Run> element"),
            _ => {}
        }
    }
}

fn read_run(reader: &mut XmlReader) -> Result<RunDefinition> {
    let mut def = RunDefinition::new("", "");
    def.segments.clear();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"GameName" => def.game_name = leaf_text(reader, &e)?,
                b"CategoryName" => def.category_name = leaf_text(reader, &e)?,
                b"Offset" => def.offset = Some(leaf_text(reader, &e)?),
                b"Metadata" => def.metadata = Some(raw_inner(reader, &e)?),
                b"AutoSplitterSettings" => {
                    def.auto_splitter_settings = Some(raw_inner(reader, &e)?)
                }
                b"AttemptCount" => {
                    let text = leaf_text(reader, &e)?;
                    def.attempt_count = text
                        .trim()
                        .parse()
                        .with_context(|| format!("invalid AttemptCount {text:?}"))?;
                }
                b"AttemptHistory" => def.attempt_history = read_attempts(reader)?,
                b"Segments" => def.segments = read_segments(reader)?,
                _ => {
                    let name = tag_name(&e);
                    let raw = raw_inner(reader, &e)?;
                    def.extra.insert(name, serde_json::Value::String(raw));
                }
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"Offset" => def.offset = Some(String::new()),
                b"Metadata" => def.metadata = Some(String::new()),
                b"AutoSplitterSettings" => def.auto_splitter_settings = Some(String::new()),
                b"AttemptHistory" | b"Segments" => {}
                _ => {
                    def.extra
                        .insert(tag_name(&e), serde_json::Value::String(String::new()));
                }
            },
            Event::End(e) if e.name().as_ref() == b"Run" => return Ok(def),
            Event::Eof => bail!("unexpected end of file in <Run>"),
            _ => {}
        }
    }
}

fn attempt_from(e: &BytesStart) -> Result<Attempt> {
    let id = id_attribute(e)?;
    Ok(Attempt {
        id: u32::try_from(id).with_context(|| format!("invalid attempt id {id}"))?,
        started: attribute(e, "started")?.unwrap_or_default(),
        is_started_synced: flag(e, "isStartedSynced")?,
        ended: attribute(e, "ended")?.unwrap_or_default(),
        is_ended_synced: flag(e, "isEndedSynced")?,
        real_time: String::new(),
        game_time: String::new(),
        pause_time: String::new(),
    })
}

fn read_attempts(reader: &mut XmlReader) -> Result<Vec<Attempt>> {
    let mut attempts = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Empty(e) if e.name().as_ref() == b"Attempt" => {
                attempts.push(attempt_from(&e)?);
            }
            Event::Start(e) if e.name().as_ref() == b"Attempt" => {
                let mut attempt = attempt_from(&e)?;
                loop {
                    match reader.read_event()? {
                        Event::Start(t) => match t.name().as_ref() {
                            b"RealTime" => attempt.real_time = leaf_text(reader, &t)?,
                            b"GameTime" => attempt.game_time = leaf_text(reader, &t)?,
                            b"PauseTime" => attempt.pause_time = leaf_text(reader, &t)?,
                            _ => skip_element(reader, &t)?,
                        },
                        Event::End(t) if t.name().as_ref() == b"Attempt" => break,
                        Event::Eof => bail!("unexpected end of file in <Attempt>"),
                        _ => {}
                    }
                }
                attempts.push(attempt);
            }
            Event::Start(e) => skip_element(reader, &e)?,
            Event::End(e) if e.name().as_ref() == b"AttemptHistory" => return Ok(attempts),
            Event::Eof => bail!("unexpected end of file in <AttemptHistory>"),
            _ => {}
        }
    }
}

fn read_segments(reader: &mut XmlReader) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"Segment" => {
                segments.push(read_segment(reader)?);
            }
            Event::Start(e) => skip_element(reader, &e)?,
            Event::End(e) if e.name().as_ref() == b"Segments" => return Ok(segments),
            Event::Eof => bail!("unexpected end of file in <Segments>"),
            _ => {}
        }
    }
}

fn read_segment(reader: &mut XmlReader) -> Result<Segment> {
    let mut segment = Segment::new("");
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"Name" => segment.name = leaf_text(reader, &e)?,
                b"Icon" => segment.icon = raw_inner(reader, &e)?,
                b"SplitTimes" => read_split_times(reader, &mut segment)?,
                b"BestSegmentTime" => {
                    let (real, game) = read_times(reader, b"BestSegmentTime")?;
                    segment.best_segment_time = real;
                    segment.best_segment_game_time = game;
                }
                b"SegmentHistory" => segment.segment_history = read_history(reader)?,
                _ => {
                    tracing::debug!(element = %tag_name(&e), "dropping unknown segment element");
                    skip_element(reader, &e)?;
                }
            },
            Event::End(e) if e.name().as_ref() == b"Segment" => return Ok(segment),
            Event::Eof => bail!("unexpected end of file in <Segment>"),
            _ => {}
        }
    }
}

fn read_split_times(reader: &mut XmlReader, segment: &mut Segment) -> Result<()> {
    let mut pb_seen = false;
    loop {
        let (e, has_body) = match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"SplitTime" => (e, true),
            Event::Empty(e) if e.name().as_ref() == b"SplitTime" => (e, false),
            Event::Start(e) => {
                skip_element(reader, &e)?;
                continue;
            }
            Event::End(e) if e.name().as_ref() == b"SplitTimes" => return Ok(()),
            Event::Eof => bail!("unexpected end of file in <SplitTimes>"),
            _ => continue,
        };
        let name = attribute(&e, "name")?.unwrap_or_default();
        let (real, game) = if has_body {
            read_times(reader, b"SplitTime")?
        } else {
            Default::default()
        };
        if name == PERSONAL_BEST && !pb_seen {
            pb_seen = true;
            segment.pb_split_time = real;
            segment.pb_game_time = game;
        } else {
            segment.comparisons.push(ComparisonTime {
                name,
                real_time: real,
                game_time: game,
            });
        }
    }
}

fn read_history(reader: &mut XmlReader) -> Result<Vec<HistoryEntry>> {
    let mut history = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Empty(e) if e.name().as_ref() == b"Time" => history.push(HistoryEntry {
                id: id_attribute(&e)?,
                time: String::new(),
                game_time: String::new(),
            }),
            Event::Start(e) if e.name().as_ref() == b"Time" => {
                let id = id_attribute(&e)?;
                let (time, game_time) = read_times(reader, b"Time")?;
                history.push(HistoryEntry { id, time, game_time });
            }
            Event::Start(e) => skip_element(reader, &e)?,
            Event::End(e) if e.name().as_ref() == b"SegmentHistory" => return Ok(history),
            Event::Eof => bail!("unexpected end of file in <SegmentHistory>"),
            _ => {}
        }
    }
}

type XmlWriter = Writer<Vec<u8>>;

fn bool_attr(v: bool) -> &'static str {
    if v {
        "True"
    } else {
        "False"
    }
}

fn write_leaf(w: &mut XmlWriter, name: &str, text: &str) -> Result<()> {
    if text.is_empty() {
        w.write_event(Event::Empty(BytesStart::new(name)))?;
        return Ok(());
    }
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Write previously captured markup without escaping it again.
fn write_raw(w: &mut XmlWriter, name: &str, raw: &str) -> Result<()> {
    if raw.is_empty() {
        w.write_event(Event::Empty(BytesStart::new(name)))?;
        return Ok(());
    }
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::from_escaped(raw)))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_times(w: &mut XmlWriter, start: BytesStart, real: &str, game: &str) -> Result<()> {
    if real.is_empty() && game.is_empty() {
        w.write_event(Event::Empty(start))?;
        return Ok(());
    }
    let end = start.to_end().into_owned();
    w.write_event(Event::Start(start))?;
    if !real.is_empty() {
        write_leaf(w, "RealTime", real)?;
    }
    if !game.is_empty() {
        write_leaf(w, "GameTime", game)?;
    }
    w.write_event(Event::End(end))?;
    Ok(())
}

fn write_attempt(w: &mut XmlWriter, attempt: &Attempt) -> Result<()> {
    let id = attempt.id.to_string();
    let start = BytesStart::new("Attempt").with_attributes([
        ("id", id.as_str()),
        ("started", attempt.started.as_str()),
        ("isStartedSynced", bool_attr(attempt.is_started_synced)),
        ("ended", attempt.ended.as_str()),
        ("isEndedSynced", bool_attr(attempt.is_ended_synced)),
    ]);
    if attempt.real_time.is_empty() && attempt.game_time.is_empty() && attempt.pause_time.is_empty()
    {
        w.write_event(Event::Empty(start))?;
        return Ok(());
    }
    w.write_event(Event::Start(start))?;
    for (name, value) in [
        ("RealTime", &attempt.real_time),
        ("GameTime", &attempt.game_time),
        ("PauseTime", &attempt.pause_time),
    ] {
        if !value.is_empty() {
            write_leaf(w, name, value)?;
        }
    }
    w.write_event(Event::End(BytesEnd::new("Attempt")))?;
    Ok(())
}

fn write_segment(w: &mut XmlWriter, segment: &Segment) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new("Segment")))?;
    write_leaf(w, "Name", &segment.name)?;
    write_raw(w, "Icon", &segment.icon)?;

    w.write_event(Event::Start(BytesStart::new("SplitTimes")))?;
    write_times(
        w,
        BytesStart::new("SplitTime").with_attributes([("name", PERSONAL_BEST)]),
        &segment.pb_split_time,
        &segment.pb_game_time,
    )?;
    for comparison in &segment.comparisons {
        write_times(
            w,
            BytesStart::new("SplitTime").with_attributes([("name", comparison.name.as_str())]),
            &comparison.real_time,
            &comparison.game_time,
        )?;
    }
    w.write_event(Event::End(BytesEnd::new("SplitTimes")))?;

    write_times(
        w,
        BytesStart::new("BestSegmentTime"),
        &segment.best_segment_time,
        &segment.best_segment_game_time,
    )?;

    if segment.segment_history.is_empty() {
        w.write_event(Event::Empty(BytesStart::new("SegmentHistory")))?;
    } else {
        w.write_event(Event::Start(BytesStart::new("SegmentHistory")))?;
        for entry in &segment.segment_history {
            let id = entry.id.to_string();
            write_times(
                w,
                BytesStart::new("Time").with_attributes([("id", id.as_str())]),
                &entry.time,
                &entry.game_time,
            )?;
        }
        w.write_event(Event::End(BytesEnd::new("SegmentHistory")))?;
    }

    w.write_event(Event::End(BytesEnd::new("Segment")))?;
    Ok(())
}

/// Encode a run as a LiveSplit document.
pub fn render(def: &RunDefinition) -> Result<String> {
    let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let version = def.format_version.as_deref().unwrap_or(DEFAULT_VERSION);
    w.write_event(Event::Start(
        BytesStart::new("Run").with_attributes([("version", version)]),
    ))?;

    write_leaf(&mut w, "GameName", &def.game_name)?;
    write_leaf(&mut w, "CategoryName", &def.category_name)?;
    for (name, value) in &def.extra {
        match value {
            serde_json::Value::String(raw) => write_raw(&mut w, name, raw)?,
            _ => tracing::warn!(field = %name, "field cannot be written to a LiveSplit file"),
        }
    }
    write_raw(&mut w, "Metadata", def.metadata.as_deref().unwrap_or_default())?;
    write_leaf(&mut w, "Offset", def.offset.as_deref().unwrap_or("00:00:00"))?;
    write_leaf(&mut w, "AttemptCount", &def.attempt_count.to_string())?;

    if def.attempt_history.is_empty() {
        w.write_event(Event::Empty(BytesStart::new("AttemptHistory")))?;
    } else {
        w.write_event(Event::Start(BytesStart::new("AttemptHistory")))?;
        for attempt in &def.attempt_history {
            write_attempt(&mut w, attempt)?;
        }
        w.write_event(Event::End(BytesEnd::new("AttemptHistory")))?;
    }

    w.write_event(Event::Start(BytesStart::new("Segments")))?;
    for segment in &def.segments {
        write_segment(&mut w, segment)?;
    }
    w.write_event(Event::End(BytesEnd::new("Segments")))?;

    if let Some(settings) = &def.auto_splitter_settings {
        write_raw(&mut w, "AutoSplitterSettings", settings)?;
    }
    w.write_event(Event::End(BytesEnd::new("Run")))?;

    let mut out = String::from_utf8(w.into_inner()).context("encoded run is not UTF-8")?;
    out.push('\n');
    Ok(out)
}
