//! Reading and writing objects on disk.
//!
//! Objects are saved in Praat's long text format:
//!
//! ```text
//! File type = "ooTextFile"
//! Object class = "PointProcess"
//!
//! xmin = 0
//! xmax = 1
//! nt = 2
//! t []:
//!     t [1] = 0.25
//!     t [2] = 0.5
//! ```
//!
//! The reader only looks at the *values*: numbers, quoted strings and
//! `<flags>`. Labels, `=` signs, bracketed indices and `!` comments are
//! skipped, so the short text format reads just as well. Several objects
//! are saved together as a `Collection`.
//!
//! [`read_file`] sniffs the content: `RIFF` is a WAV file, anything with an
//! `ooTextFile` header is a text object or Collection.

use std::path::Path;

use ndarray::{Array1, Array2};

use crate::error::{praat_bail, Error, Result};
use crate::formant::{Formant, FormantFrame, FormantPoint};
use crate::harmonicity::Harmonicity;
use crate::intensity::Intensity;
use crate::matrix::{Axis, Matrix};
use crate::objects::{Object, Thing};
use crate::pitch::{Pitch, PitchCandidate, PitchFrame};
use crate::point_process::PointProcess;
use crate::sampled::Sampled;
use crate::sound::Sound;
use crate::spectrogram::Spectrogram;
use crate::spectrum::Spectrum;
use crate::textgrid::{Interval, Point, TextGrid, Tier, TierKind};

// ========== Writing ==========

/// Accumulates labelled lines with Praat's indentation.
#[derive(Debug, Default)]
struct TextWriter {
    out: String,
    depth: usize,
}

impl TextWriter {
    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn real(&mut self, label: &str, x: f64) {
        let text = if x.is_nan() { "--undefined--".to_string() } else { x.to_string() };
        self.line(&format!("{} = {} ", label, text));
    }

    fn integer(&mut self, label: &str, n: usize) {
        self.line(&format!("{} = {} ", label, n));
    }

    fn string(&mut self, label: &str, s: &str) {
        self.line(&format!("{} = \"{}\" ", label, s.replace('"', "\"\"")));
    }

    fn open(&mut self, label: &str) {
        self.line(&format!("{}:", label));
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn axis(&mut self, prefix: char, min: f64, max: f64, n: usize, step: f64, first: f64) {
        self.real(&format!("{}min", prefix), min);
        self.real(&format!("{}max", prefix), max);
        self.integer(&format!("n{}", prefix), n);
        self.real(&format!("d{}", prefix), step);
        self.real(&format!("{}1", prefix), first);
    }

    fn cells(&mut self, values: &Array2<f64>) {
        self.open("z [] []");
        for (r, row) in values.rows().into_iter().enumerate() {
            self.open(&format!("z [{}]", r + 1));
            for (c, &v) in row.iter().enumerate() {
                self.real(&format!("z [{}] [{}]", r + 1, c + 1), v);
            }
            self.close();
        }
        self.close();
    }
}

/// Praat's class tag, including the format version.
fn class_tag(object: &Object) -> &'static str {
    match object {
        Object::Sound(_) => "Sound 2",
        Object::Intensity(_) => "Intensity 2",
        Object::Pitch(_) => "Pitch 1",
        Object::PointProcess(_) => "PointProcess",
        Object::TextGrid(_) => "TextGrid",
        Object::Spectrogram(_) => "Spectrogram 2",
        Object::Matrix(_) => "Matrix 2",
        Object::Formant(_) => "Formant 2",
        Object::Harmonicity(_) => "Harmonicity 2",
        Object::Spectrum(_) => "Spectrum 2",
    }
}

fn write_body(w: &mut TextWriter, object: &Object) {
    match object {
        Object::Sound(s) => {
            w.axis('x', s.xmin(), s.xmax(), s.nx(), s.dx(), s.x1());
            let ny = s.n_channels();
            w.axis('y', 1.0, ny as f64, ny, 1.0, 1.0);
            w.cells(s.values());
        }
        Object::Intensity(i) => {
            // A one-row Vector, like Sound
            let x1 = i.times().first().copied().unwrap_or(i.xmin() + 0.5 * i.time_step());
            w.axis('x', i.xmin(), i.xmax(), i.n_frames(), i.time_step(), x1);
            w.axis('y', 1.0, 1.0, 1, 1.0, 1.0);
            w.cells(&i.values().clone().insert_axis(ndarray::Axis(0)));
        }
        Object::Pitch(p) => {
            let frames = p.frames();
            let x1 = frames.first().map_or(p.xmin() + 0.5 * p.time_step(), |f| f.time);
            let max_candidates = frames.iter().map(|f| f.candidates.len()).max().unwrap_or(0).max(1);
            w.axis('x', p.xmin(), p.xmax(), frames.len(), p.time_step(), x1);
            w.real("ceiling", p.pitch_ceiling());
            w.integer("maxnCandidates", max_candidates);
            w.open("frame []");
            for (k, frame) in frames.iter().enumerate() {
                w.open(&format!("frame [{}]", k + 1));
                w.real("intensity", frame.intensity);
                w.integer("nCandidates", frame.candidates.len());
                w.open("candidate []");
                for (j, c) in frame.candidates.iter().enumerate() {
                    w.open(&format!("candidate [{}]", j + 1));
                    w.real("frequency", c.frequency);
                    w.real("strength", c.strength);
                    w.close();
                }
                w.close();
                w.close();
            }
            w.close();
        }
        Object::PointProcess(p) => {
            w.real("xmin", p.xmin());
            w.real("xmax", p.xmax());
            w.integer("nt", p.len());
            w.open("t []");
            for (k, &t) in p.times().iter().enumerate() {
                w.real(&format!("t [{}]", k + 1), t);
            }
            w.close();
        }
        Object::TextGrid(tg) => {
            w.real("xmin", tg.xmin());
            w.real("xmax", tg.xmax());
            w.line("tiers? <exists> ");
            w.integer("size", tg.n_tiers());
            w.open("item []");
            for (k, tier) in tg.tiers().iter().enumerate() {
                w.open(&format!("item [{}]", k + 1));
                match &tier.kind {
                    TierKind::Intervals(intervals) => {
                        w.string("class", "IntervalTier");
                        w.string("name", &tier.name);
                        w.real("xmin", tier.xmin);
                        w.real("xmax", tier.xmax);
                        w.integer("intervals: size", intervals.len());
                        for (j, interval) in intervals.iter().enumerate() {
                            w.open(&format!("intervals [{}]", j + 1));
                            w.real("xmin", interval.xmin);
                            w.real("xmax", interval.xmax);
                            w.string("text", &interval.text);
                            w.close();
                        }
                    }
                    TierKind::Points(points) => {
                        w.string("class", "TextTier");
                        w.string("name", &tier.name);
                        w.real("xmin", tier.xmin);
                        w.real("xmax", tier.xmax);
                        w.integer("points: size", points.len());
                        for (j, point) in points.iter().enumerate() {
                            w.open(&format!("points [{}]", j + 1));
                            w.real("number", point.time);
                            w.string("mark", &point.mark);
                            w.close();
                        }
                    }
                }
                w.close();
            }
            w.close();
        }
        Object::Spectrogram(s) => {
            w.axis('x', s.xmin(), s.xmax(), s.nx(), s.dx(), s.x1());
            w.axis('y', s.freq_min(), s.freq_max(), s.n_freqs(), s.freq_step(), s.get_freq_from_bin(0));
            w.cells(s.values());
        }
        Object::Matrix(m) => {
            let (x, y) = (m.x_axis(), m.y_axis());
            w.axis('x', x.min, x.max, m.n_columns(), x.step, x.first);
            w.axis('y', y.min, y.max, m.n_rows(), y.step, y.first);
            w.cells(m.values());
        }
        Object::Formant(f) => {
            w.axis('x', f.xmin(), f.xmax(), f.nx(), f.dx(), f.x1());
            w.integer("maxnFormants", f.max_num_formants());
            w.open("frames []");
            for (k, frame) in f.frames().iter().enumerate() {
                w.open(&format!("frames [{}]", k + 1));
                w.real("intensity", frame.intensity);
                w.integer("numberOfFormants", frame.n_formants());
                w.open("formant []");
                for (j, point) in frame.formants.iter().enumerate() {
                    w.open(&format!("formant [{}]", j + 1));
                    w.real("frequency", point.frequency);
                    w.real("bandwidth", point.bandwidth);
                    w.close();
                }
                w.close();
                w.close();
            }
            w.close();
        }
        Object::Harmonicity(h) => {
            w.axis('x', h.xmin(), h.xmax(), h.nx(), h.dx(), h.x1());
            w.axis('y', 1.0, 1.0, 1, 1.0, 1.0);
            w.cells(&h.values().clone().insert_axis(ndarray::Axis(0)));
        }
        Object::Spectrum(s) => {
            // Real parts in row 1, imaginary parts in row 2
            w.axis('x', 0.0, s.f_max(), s.n_bins(), s.df(), 0.0);
            w.axis('y', 1.0, 2.0, 2, 1.0, 1.0);
            w.cells(&s.values());
        }
    }
}

fn header(class: &str) -> TextWriter {
    let mut w = TextWriter::default();
    w.line("File type = \"ooTextFile\"");
    w.line(&format!("Object class = \"{}\"", class));
    w.line("");
    w
}

/// One object in Praat's text format.
pub fn to_text(object: &Object) -> String {
    let mut w = header(class_tag(object));
    write_body(&mut w, object);
    w.out
}

/// Several named objects as a Collection.
pub fn collection_to_text(things: &[&Thing]) -> String {
    let mut w = header("Collection");
    w.integer("size", things.len());
    w.open("item []");
    for (k, thing) in things.iter().enumerate() {
        w.open(&format!("item [{}]", k + 1));
        w.string("class", class_tag(thing.object()));
        w.string("name", thing.name().unwrap_or(""));
        write_body(&mut w, thing.object());
        w.close();
    }
    w.close();
    w.out
}

/// Save one object, or a Collection when there are several.
pub fn save_text_file<P: AsRef<Path>>(path: P, things: &[&Thing]) -> Result<()> {
    let path = path.as_ref();
    let text = match things {
        [] => praat_bail!("No objects to save."),
        [single] => to_text(single.object()),
        several => collection_to_text(several),
    };
    std::fs::write(path, text).map_err(|_| Error::praat(format!("Cannot create file “{}”.", path.display())))
}

// ========== Reading ==========

/// Pulls values out of Praat text, skipping labels.
struct TextReader<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    text: &'a str,
}

#[derive(Debug, PartialEq)]
enum Token {
    Number(f64),
    Text(String),
    Flag(String),
}

impl<'a> TextReader<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.char_indices().peekable(),
            text,
        }
    }

    fn word(&mut self, start: usize, first: char) -> &'a str {
        let mut end = start + first.len_utf8();
        while let Some(&(i, c)) = self.chars.peek() {
            if c.is_whitespace() {
                break;
            }
            end = i + c.len_utf8();
            self.chars.next();
        }
        &self.text[start..end]
    }

    fn next_token(&mut self) -> Result<Token> {
        while let Some((start, c)) = self.chars.next() {
            match c {
                '"' => {
                    let mut s = String::new();
                    loop {
                        match self.chars.next() {
                            Some((_, '"')) if self.chars.peek().map(|p| p.1) == Some('"') => {
                                self.chars.next();
                                s.push('"');
                            }
                            Some((_, '"')) => return Ok(Token::Text(s)),
                            Some((_, ch)) => s.push(ch),
                            None => praat_bail!("Unterminated string in text file."),
                        }
                    }
                }
                '!' => {
                    for (_, ch) in self.chars.by_ref() {
                        if ch == '\n' {
                            break;
                        }
                    }
                }
                '[' => {
                    for (_, ch) in self.chars.by_ref() {
                        if ch == ']' {
                            break;
                        }
                    }
                }
                '<' => {
                    let mut flag = String::new();
                    for (_, ch) in self.chars.by_ref() {
                        if ch == '>' {
                            break;
                        }
                        flag.push(ch);
                    }
                    return Ok(Token::Flag(flag));
                }
                c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                    let word = self.word(start, c);
                    if word == "--undefined--" {
                        return Ok(Token::Number(f64::NAN));
                    }
                    let number = word.trim_end_matches([',', ';']);
                    if let Ok(x) = number.parse::<f64>() {
                        return Ok(Token::Number(x));
                    }
                }
                c if c.is_alphabetic() => {
                    let mut end = start + c.len_utf8();
                    while let Some(&(i, ch)) = self.chars.peek() {
                        if !(ch.is_alphanumeric() || ch == '_') {
                            break;
                        }
                        end = i + ch.len_utf8();
                        self.chars.next();
                    }
                    match &self.text[start..end] {
                        "inf" => return Ok(Token::Number(f64::INFINITY)),
                        "NaN" => return Ok(Token::Number(f64::NAN)),
                        _ => {}
                    }
                }
                _ => {}
            }
        }
        praat_bail!("Early end of text file.")
    }

    fn real(&mut self) -> Result<f64> {
        match self.next_token()? {
            Token::Number(x) => Ok(x),
            other => praat_bail!("Expected a number in text file, found {:?}.", other),
        }
    }

    fn integer(&mut self) -> Result<usize> {
        let x = self.real()?;
        if x < 0.0 || x.fract() != 0.0 {
            praat_bail!("Expected a non-negative integer in text file, found {}.", x);
        }
        Ok(x as usize)
    }

    fn string(&mut self) -> Result<String> {
        match self.next_token()? {
            Token::Text(s) => Ok(s),
            other => praat_bail!("Expected a string in text file, found {:?}.", other),
        }
    }

    fn flag(&mut self) -> Result<bool> {
        match self.next_token()? {
            Token::Flag(f) => Ok(f == "exists" || f == "true"),
            other => praat_bail!("Expected a flag in text file, found {:?}.", other),
        }
    }

    fn reals(&mut self, n: usize) -> Result<Vec<f64>> {
        (0..n).map(|_| self.real()).collect()
    }

    fn axis(&mut self) -> Result<(f64, f64, usize, f64, f64)> {
        Ok((self.real()?, self.real()?, self.integer()?, self.real()?, self.real()?))
    }

    fn cells(&mut self, rows: usize, cols: usize) -> Result<Array2<f64>> {
        let flat = self.reals(rows * cols)?;
        Array2::from_shape_vec((rows, cols), flat).map_err(|e| Error::praat(e.to_string()))
    }
}

fn read_body(r: &mut TextReader<'_>, class: &str) -> Result<Object> {
    let name = class.split_whitespace().next().unwrap_or(class);
    let object = match name {
        "Sound" => {
            let (xmin, xmax, nx, dx, x1) = r.axis()?;
            let (_, _, ny, _, _) = r.axis()?;
            Object::Sound(Sound::with_domain(r.cells(ny, nx)?, xmin, xmax, dx, x1))
        }
        "Intensity" => {
            let (xmin, xmax, nx, dx, x1) = r.axis()?;
            let (_, _, ny, _, _) = r.axis()?;
            if ny != 1 {
                praat_bail!("An Intensity should have 1 row, not {}.", ny);
            }
            let values = r.cells(1, nx)?.row(0).to_owned();
            let times = Array1::from_iter((0..nx).map(|k| x1 + k as f64 * dx));
            // The analysis floor is not part of the file
            Object::Intensity(Intensity::new(xmin, xmax, times, values, dx, f64::NAN))
        }
        "Pitch" => {
            let (xmin, xmax, nx, dx, x1) = r.axis()?;
            let ceiling = r.real()?;
            let max_candidates = r.integer()?;
            let mut frames = Vec::with_capacity(nx);
            for k in 0..nx {
                let (intensity, n) = (r.real()?, r.integer()?);
                if n > max_candidates {
                    praat_bail!(
                        "Pitch frame {} has {} candidates, more than the maximum of {}.",
                        k + 1,
                        n,
                        max_candidates
                    );
                }
                let candidates = (0..n)
                    .map(|_| Ok(PitchCandidate::new(r.real()?, r.real()?)))
                    .collect::<Result<Vec<_>>>()?;
                frames.push(PitchFrame::new(x1 + k as f64 * dx, candidates, intensity));
            }
            Object::Pitch(Pitch::new(xmin, xmax, frames, dx, f64::NAN, ceiling))
        }
        "PointProcess" => {
            let (xmin, xmax, nt) = (r.real()?, r.real()?, r.integer()?);
            let times = r.reals(nt)?;
            Object::PointProcess(PointProcess::from_times(&times, Some((xmin, xmax)))?)
        }
        "TextGrid" => {
            let (xmin, xmax) = (r.real()?, r.real()?);
            let n = if r.flag()? { r.integer()? } else { 0 };
            let mut tiers = Vec::with_capacity(n);
            for _ in 0..n {
                let tier_class = r.string()?;
                let name = r.string()?;
                let (tmin, tmax, size) = (r.real()?, r.real()?, r.integer()?);
                let kind = match tier_class.as_str() {
                    "IntervalTier" => TierKind::Intervals(
                        (0..size)
                            .map(|_| {
                                Ok(Interval {
                                    xmin: r.real()?,
                                    xmax: r.real()?,
                                    text: r.string()?,
                                })
                            })
                            .collect::<Result<Vec<_>>>()?,
                    ),
                    "TextTier" => TierKind::Points(
                        (0..size)
                            .map(|_| {
                                Ok(Point {
                                    time: r.real()?,
                                    mark: r.string()?,
                                })
                            })
                            .collect::<Result<Vec<_>>>()?,
                    ),
                    other => praat_bail!("Unknown tier class \"{}\".", other),
                };
                tiers.push(Tier {
                    name,
                    xmin: tmin,
                    xmax: tmax,
                    kind,
                });
            }
            Object::TextGrid(TextGrid::new(xmin, xmax, tiers)?)
        }
        "Spectrogram" => {
            let (xmin, xmax, nx, dx, x1) = r.axis()?;
            let (ymin, ymax, ny, dy, _) = r.axis()?;
            let values = r.cells(ny, nx)?;
            Object::Spectrogram(Spectrogram::new(values, xmin, xmax, ymin, ymax, dx, dy, x1))
        }
        "Matrix" => {
            let (xmin, xmax, nx, dx, x1) = r.axis()?;
            let (ymin, ymax, ny, dy, y1) = r.axis()?;
            let values = r.cells(ny, nx)?;
            let axis = |min, max, step, first| Axis { min, max, step, first };
            Object::Matrix(Matrix::new(axis(xmin, xmax, dx, x1), axis(ymin, ymax, dy, y1), values))
        }
        "Formant" => {
            let (xmin, xmax, nx, dx, x1) = r.axis()?;
            let max_formants = r.integer()?;
            let mut frames = Vec::with_capacity(nx);
            for k in 0..nx {
                let (intensity, n) = (r.real()?, r.integer()?);
                if n > max_formants {
                    praat_bail!(
                        "Formant frame {} has {} formants, more than the maximum of {}.",
                        k + 1,
                        n,
                        max_formants
                    );
                }
                let formants = (0..n)
                    .map(|_| Ok(FormantPoint::new(r.real()?, r.real()?)))
                    .collect::<Result<Vec<_>>>()?;
                frames.push(FormantFrame::new(x1 + k as f64 * dx, intensity, formants));
            }
            Object::Formant(Formant::new(xmin, xmax, frames, dx, max_formants))
        }
        "Harmonicity" => {
            let (xmin, xmax, nx, dx, x1) = r.axis()?;
            let (_, _, ny, _, _) = r.axis()?;
            if ny != 1 {
                praat_bail!("A Harmonicity should have 1 row, not {}.", ny);
            }
            let values = r.cells(1, nx)?.row(0).to_owned();
            let times = Array1::from_iter((0..nx).map(|k| x1 + k as f64 * dx));
            Object::Harmonicity(Harmonicity::new(xmin, xmax, times, values, dx, f64::NAN))
        }
        "Spectrum" => {
            let (_, xmax, nx, dx, _) = r.axis()?;
            let (_, _, ny, _, _) = r.axis()?;
            if ny != 2 {
                praat_bail!("A Spectrum should have 2 rows, not {}.", ny);
            }
            let cells = r.cells(2, nx)?;
            Object::Spectrum(Spectrum::new(cells.row(0).to_owned(), cells.row(1).to_owned(), dx, xmax)?)
        }
        other => praat_bail!("Class \"{}\" is not known.", other),
    };
    Ok(object)
}

/// Parse Praat text; `name` is given to a single object.
///
/// A Collection yields its items under their own names.
pub fn parse_text(text: &str, name: Option<&str>) -> Result<Vec<Thing>> {
    let mut r = TextReader::new(text);
    let file_type = r.string()?;
    if !file_type.starts_with("ooTextFile") {
        praat_bail!("File type \"{}\" is not a Praat text file.", file_type);
    }
    let class = r.string()?;
    if class == "Collection" {
        let size = r.integer()?;
        let mut things = Vec::with_capacity(size);
        for _ in 0..size {
            let item_class = r.string()?;
            let item_name = r.string()?;
            let object = read_body(&mut r, &item_class)?;
            things.push(Thing::new(object, (!item_name.is_empty()).then_some(item_name.as_str())));
        }
        return Ok(things);
    }
    Ok(vec![Thing::new(read_body(&mut r, &class)?, name)])
}

fn decode_text(bytes: &[u8]) -> Option<String> {
    let utf16 = |be: bool| {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|p| if be { u16::from_be_bytes([p[0], p[1]]) } else { u16::from_le_bytes([p[0], p[1]]) })
            .collect();
        String::from_utf16(&units).ok()
    };
    match bytes {
        [0xFE, 0xFF, ..] => utf16(true),
        [0xFF, 0xFE, ..] => utf16(false),
        [0xEF, 0xBB, 0xBF, rest @ ..] => std::str::from_utf8(rest).ok().map(str::to_string),
        _ => std::str::from_utf8(bytes).ok().map(str::to_string),
    }
}

/// Read every object in a file, dispatching on its content.
///
/// Single objects are named after the file stem.
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Vec<Thing>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|_| Error::praat(format!("Cannot open file “{}”.", path.display())))?;
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned());
    log::debug!("reading {} ({} bytes)", path.display(), bytes.len());

    if bytes.starts_with(b"RIFF") {
        let sound = Sound::from_reader(std::io::Cursor::new(bytes))
            .map_err(|e| Error::praat(format!("{}\nSound not read from file “{}”.", e, path.display())))?;
        return Ok(vec![Thing::new(sound, stem.as_deref())]);
    }
    if let Some(text) = decode_text(&bytes) {
        if text.trim_start().starts_with("File type = \"ooTextFile") {
            return parse_text(&text, stem.as_deref())
                .map_err(|e| e.context(format!("File “{}” not read.", path.display())));
        }
    }
    praat_bail!("File “{}” not recognized.", path.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_and_indices_are_skipped() {
        let mut r = TextReader::new("x1 = 0.5 ! comment 7\n z [1] [2] = -3e-2 name = \"a \"\"b\"\"\" <exists>");
        assert_eq!(r.real().unwrap(), 0.5);
        assert_eq!(r.real().unwrap(), -0.03);
        assert_eq!(r.string().unwrap(), "a \"b\"");
        assert!(r.flag().unwrap());
        assert!(r.real().is_err());
    }

    #[test]
    fn point_process_text_matches_praat_layout() {
        let pp = PointProcess::from_times(&[0.25, 0.5], Some((0.0, 1.0))).unwrap();
        let text = to_text(&Object::PointProcess(pp.clone()));
        assert!(text.starts_with("File type = \"ooTextFile\"\nObject class = \"PointProcess\"\n\nxmin = 0 \n"));
        assert!(text.contains("    t [2] = 0.5 \n"));
        let back = parse_text(&text, Some("pp")).unwrap();
        assert_eq!(back[0].object(), &Object::PointProcess(pp));
        assert_eq!(back[0].name(), Some("pp"));
    }

    #[test]
    fn intensity_is_written_as_a_one_row_vector() {
        let intensity = Intensity::new(
            0.0,
            0.1,
            Array1::from_vec(vec![0.03, 0.05, 0.07]),
            Array1::from_vec(vec![58.25, 64.5, 61.75]),
            0.02,
            100.0,
        );
        let text = to_text(&Object::Intensity(intensity));
        assert!(text.contains("Object class = \"Intensity 2\"\n"));
        assert!(text.contains("x1 = 0.03 \nymin = 1 \nymax = 1 \nny = 1 \n"));
        assert!(text.contains("        z [1] [2] = 64.5 \n"));
        match parse_text(&text, None).unwrap()[0].object() {
            Object::Intensity(back) => {
                assert_eq!(back.values().to_vec(), vec![58.25, 64.5, 61.75]);
                assert!((back.times()[2] - 0.07).abs() < 1e-12);
            }
            other => panic!("unexpected {:?}", other.class()),
        }
    }

    #[test]
    fn mismatched_layouts_are_rejected() {
        let two_rows = "File type = \"ooTextFile\"\nObject class = \"Intensity 2\"\n\
            0 1 2 0.5 0.25 1 2 2 1 1 60 61 62 63\n";
        let err = parse_text(two_rows, None).unwrap_err();
        assert_eq!(err.to_string(), "An Intensity should have 1 row, not 2.");

        let crowded = "File type = \"ooTextFile\"\nObject class = \"Pitch 1\"\n\
            0 1 1 0.5 0.5 600 1 0.9 2 100 0.9 0 0.3\n";
        let err = parse_text(crowded, None).unwrap_err();
        assert_eq!(err.to_string(), "Pitch frame 1 has 2 candidates, more than the maximum of 1.");
    }

    #[test]
    fn formant_frames_nest_their_formants() {
        let frames = (0..2)
            .map(|k| {
                let points = (1..=k + 1).map(|j| FormantPoint::new(500.0 * j as f64, 60.0)).collect();
                FormantFrame::new(0.05 + k as f64 * 0.1, 0.25, points)
            })
            .collect();
        let formant = Object::Formant(Formant::new(0.0, 0.2, frames, 0.1, 5));
        let text = to_text(&formant);
        assert!(text.contains("Object class = \"Formant 2\"\n"));
        assert!(text.contains("maxnFormants = 5 \nframes []:\n    frames [1]:\n        intensity = 0.25 \n"));
        assert!(text.contains("            formant [2]:\n                frequency = 1000 \n"));
        assert_eq!(parse_text(&text, None).unwrap()[0].object(), &formant);
    }

    #[test]
    fn spectrum_keeps_real_and_imaginary_rows() {
        let spectrum = Spectrum::new(
            Array1::from_vec(vec![1.0, 0.5, -0.25]),
            Array1::from_vec(vec![0.0, 0.125, 0.0]),
            4000.0,
            8000.0,
        )
        .unwrap();
        let object = Object::Spectrum(spectrum);
        let text = to_text(&object);
        assert!(text.contains("Object class = \"Spectrum 2\"\n"));
        assert!(text.contains("ny = 2 \n"));
        assert!(text.contains("        z [2] [2] = 0.125 \n"));
        assert_eq!(parse_text(&text, None).unwrap()[0].object(), &object);
    }

    #[test]
    fn textgrid_round_trip() {
        let mut tg = TextGrid::from_names(0.0, 2.0, "words tones", "tones").unwrap();
        tg.insert_boundary(1, 1.0).unwrap();
        tg.set_interval_text(1, 1, "say \"hi\"").unwrap();
        tg.insert_point(2, 0.5, "H").unwrap();
        let object = Object::TextGrid(tg);
        let back = parse_text(&to_text(&object), None).unwrap();
        assert_eq!(back[0].object(), &object);
    }

    #[test]
    fn unknown_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let junk = dir.path().join("junk.txt");
        std::fs::write(&junk, "hello").unwrap();
        let err = read_file(&junk).unwrap_err();
        assert_eq!(err.to_string(), format!("File “{}” not recognized.", junk.display()));
        let missing = dir.path().join("missing.wav");
        let err = read_file(&missing).unwrap_err();
        assert_eq!(err.to_string(), format!("Cannot open file “{}”.", missing.display()));
    }
}
