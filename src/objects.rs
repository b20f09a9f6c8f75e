//! Objects: the host-side arena and the per-call object list.
//!
//! Host code owns engine objects through [`Handle`]s into an [`ObjectTable`].
//! When a command or script runs, the objects it needs are *lent* to an
//! [`Environment`], Praat's object list for the duration of the call, where
//! they get 1-based ids and selection flags. Afterwards
//! [`Environment::finish`] gives every lent object back under its original
//! handle, whatever happened during the call, and moves the selected new
//! objects into the table.

use crate::error::{praat_bail, Error, Result};
use crate::formant::Formant;
use crate::harmonicity::Harmonicity;
use crate::intensity::Intensity;
use crate::matrix::Matrix;
use crate::pitch::Pitch;
use crate::point_process::PointProcess;
use crate::sampled::Sampled;
use crate::sound::Sound;
use crate::spectrogram::Spectrogram;
use crate::spectrum::Spectrum;
use crate::textgrid::TextGrid;
use crate::value::format_number;

/// Engine object classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Class {
    Sound,
    Intensity,
    Pitch,
    PointProcess,
    TextGrid,
    Spectrogram,
    Matrix,
    Formant,
    Harmonicity,
    Spectrum,
}

impl Class {
    /// All classes, in registry order.
    pub const ALL: [Class; 10] = [
        Class::Sound,
        Class::Intensity,
        Class::Pitch,
        Class::PointProcess,
        Class::TextGrid,
        Class::Spectrogram,
        Class::Matrix,
        Class::Formant,
        Class::Harmonicity,
        Class::Spectrum,
    ];

    /// The class name as Praat spells it.
    pub fn name(self) -> &'static str {
        match self {
            Class::Sound => "Sound",
            Class::Intensity => "Intensity",
            Class::Pitch => "Pitch",
            Class::PointProcess => "PointProcess",
            Class::TextGrid => "TextGrid",
            Class::Spectrogram => "Spectrogram",
            Class::Matrix => "Matrix",
            Class::Formant => "Formant",
            Class::Harmonicity => "Harmonicity",
            Class::Spectrum => "Spectrum",
        }
    }

    /// Look up a class by name.
    pub fn from_name(name: &str) -> Option<Class> {
        Class::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Whether objects of this class sample a time or x domain on a grid.
    pub fn is_sampled(self) -> bool {
        !matches!(self, Class::PointProcess | Class::TextGrid)
    }
}

impl std::fmt::Display for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An engine object of any class.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Sound(Sound),
    Intensity(Intensity),
    Pitch(Pitch),
    PointProcess(PointProcess),
    TextGrid(TextGrid),
    Spectrogram(Spectrogram),
    Matrix(Matrix),
    Formant(Formant),
    Harmonicity(Harmonicity),
    Spectrum(Spectrum),
}

/// Typed access into [`Object`].
pub trait ObjectKind: Sized {
    /// The class of this type.
    const CLASS: Class;
    /// Borrow the payload if `object` has this class.
    fn from_object(object: &Object) -> Option<&Self>;
    /// Mutably borrow the payload if `object` has this class.
    fn from_object_mut(object: &mut Object) -> Option<&mut Self>;
}

macro_rules! object_kinds {
    ($($ty:ident),* $(,)?) => {
        $(
            impl ObjectKind for $ty {
                const CLASS: Class = Class::$ty;

                fn from_object(object: &Object) -> Option<&Self> {
                    match object {
                        Object::$ty(inner) => Some(inner),
                        _ => None,
                    }
                }

                fn from_object_mut(object: &mut Object) -> Option<&mut Self> {
                    match object {
                        Object::$ty(inner) => Some(inner),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for Object {
                fn from(inner: $ty) -> Self {
                    Object::$ty(inner)
                }
            }
        )*

        impl Object {
            /// The class of this object.
            pub fn class(&self) -> Class {
                match self {
                    $(Object::$ty(_) => Class::$ty,)*
                }
            }
        }
    };
}

object_kinds!(
    Sound,
    Intensity,
    Pitch,
    PointProcess,
    TextGrid,
    Spectrogram,
    Matrix,
    Formant,
    Harmonicity,
    Spectrum,
);

impl Object {
    /// The sampled domain of this object, if it has one.
    pub fn as_sampled(&self) -> Option<&dyn Sampled> {
        match self {
            Object::Sound(s) => Some(s),
            Object::Intensity(i) => Some(i),
            Object::Pitch(p) => Some(p),
            Object::Spectrogram(s) => Some(s),
            Object::Matrix(m) => Some(m),
            Object::Formant(f) => Some(f),
            Object::Harmonicity(h) => Some(h),
            Object::Spectrum(s) => Some(s),
            Object::PointProcess(_) | Object::TextGrid(_) => None,
        }
    }

    /// Time (or x) domain.
    pub fn domain(&self) -> (f64, f64) {
        match self {
            Object::PointProcess(p) => (p.xmin(), p.xmax()),
            Object::TextGrid(t) => (t.xmin(), t.xmax()),
            other => other
                .as_sampled()
                .map(|s| (s.xmin(), s.xmax()))
                .unwrap_or((f64::NAN, f64::NAN)),
        }
    }

    fn info_lines(&self) -> Vec<String> {
        if let Object::Spectrum(s) = self {
            return vec![
                format!("Frequency domain: 0 to {} Hz", format_number(s.f_max())),
                format!("Number of frequency bins: {}", s.n_bins()),
                format!("Frequency step: {} Hz", format_number(s.df())),
            ];
        }
        let (xmin, xmax) = self.domain();
        let mut lines = vec![
            format!("Start time: {} seconds", format_number(xmin)),
            format!("End time: {} seconds", format_number(xmax)),
            format!("Total duration: {} seconds", format_number(xmax - xmin)),
        ];
        match self {
            Object::Sound(s) => {
                lines.push(format!("Number of channels: {}", s.n_channels()));
                lines.push(format!("Number of samples: {}", s.n_samples()));
                lines.push(format!("Sampling frequency: {} Hz", format_number(s.sample_rate())));
            }
            Object::Pitch(p) => {
                lines.push(format!("Number of frames: {} ({} voiced)", p.n_frames(), p.count_voiced_frames()));
                if p.pitch_floor().is_finite() {
                    lines.push(format!("Pitch floor: {} Hz", format_number(p.pitch_floor())));
                }
                lines.push(format!("Pitch ceiling: {} Hz", format_number(p.pitch_ceiling())));
            }
            Object::PointProcess(p) => lines.push(format!("Number of points: {}", p.len())),
            Object::TextGrid(t) => lines.push(format!("Number of tiers: {}", t.n_tiers())),
            Object::Matrix(m) => {
                lines.push(format!("Number of rows: {}", m.n_rows()));
                lines.push(format!("Number of columns: {}", m.n_columns()));
            }
            Object::Formant(f) => lines.push(format!("Maximum number of formants: {}", f.max_num_formants())),
            Object::Intensity(_) | Object::Spectrogram(_) | Object::Harmonicity(_) | Object::Spectrum(_) => {}
        }
        if let Some(s) = self.as_sampled() {
            if !matches!(self, Object::Sound(_) | Object::Pitch(_) | Object::Matrix(_)) {
                lines.push(format!("Number of frames: {}", s.nx()));
            }
            lines.push(format!("Time step: {} seconds", format_number(s.dx())));
        }
        lines
    }
}

/// Replace every character that is not alphanumeric or `_` by `_`.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// A named engine object.
#[derive(Debug, Clone, PartialEq)]
pub struct Thing {
    name: Option<String>,
    object: Object,
}

impl Thing {
    /// Wrap `object`, sanitising `name`.
    pub fn new(object: impl Into<Object>, name: Option<&str>) -> Self {
        Self {
            name: name.map(sanitize_name),
            object: object.into(),
        }
    }

    /// The object's name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Rename (sanitised); `None` removes the name.
    pub fn set_name(&mut self, name: Option<&str>) {
        self.name = name.map(sanitize_name);
    }

    /// `Class "name"`, or just `Class` when unnamed.
    pub fn full_name(&self) -> String {
        match &self.name {
            Some(name) => format!("{} \"{}\"", self.class(), name),
            None => self.class().to_string(),
        }
    }

    /// The object's class.
    pub fn class(&self) -> Class {
        self.object.class()
    }

    /// The wrapped object.
    pub fn object(&self) -> &Object {
        &self.object
    }

    /// The wrapped object, mutably.
    pub fn object_mut(&mut self) -> &mut Object {
        &mut self.object
    }

    /// Unwrap the object.
    pub fn into_object(self) -> Object {
        self.object
    }

    /// Typed access to the payload.
    pub fn downcast<T: ObjectKind>(&self) -> Result<&T> {
        T::from_object(&self.object).ok_or_else(|| {
            Error::praat(format!("{} is not a {}.", self.full_name(), T::CLASS))
        })
    }

    /// Typed mutable access to the payload.
    pub fn downcast_mut<T: ObjectKind>(&mut self) -> Result<&mut T> {
        let full_name = self.full_name();
        T::from_object_mut(&mut self.object).ok_or_else(|| Error::praat(format!("{} is not a {}.", full_name, T::CLASS)))
    }

    /// The text of the `Info` command.
    pub fn info(&self) -> String {
        let mut text = format!(
            "Object type: {}\nObject name: {}\n",
            self.class(),
            self.name().unwrap_or("untitled")
        );
        for line in self.object.info_lines() {
            text.push_str(&line);
            text.push('\n');
        }
        text
    }
}

// ========== Arena ==========

/// A generational reference to an object in an [`ObjectTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    thing: Option<Thing>,
    /// Reserved while the thing is lent to an environment.
    lent: bool,
}

/// Host-side arena of engine objects.
#[derive(Debug, Default)]
pub struct ObjectTable {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

const STALE: &str = "Object no longer exists.";

impl ObjectTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a thing and return its handle.
    pub fn insert(&mut self, thing: Thing) -> Handle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation += 1;
            slot.thing = Some(thing);
            return Handle {
                index,
                generation: slot.generation,
            };
        }
        self.slots.push(Slot {
            generation: 0,
            thing: Some(thing),
            lent: false,
        });
        Handle {
            index: (self.slots.len() - 1) as u32,
            generation: 0,
        }
    }

    fn slot(&self, handle: Handle) -> Option<&Slot> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
    }

    fn slot_mut(&mut self, handle: Handle) -> Option<&mut Slot> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
    }

    /// Whether `handle` refers to a live object.
    pub fn contains(&self, handle: Handle) -> bool {
        self.slot(handle).is_some_and(|s| s.thing.is_some())
    }

    /// Borrow the thing behind `handle`.
    pub fn get(&self, handle: Handle) -> Result<&Thing> {
        self.slot(handle)
            .and_then(|s| s.thing.as_ref())
            .ok_or_else(|| Error::praat(STALE))
    }

    /// Mutably borrow the thing behind `handle`.
    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut Thing> {
        self.slot_mut(handle)
            .and_then(|s| s.thing.as_mut())
            .ok_or_else(|| Error::praat(STALE))
    }

    /// Remove and return the thing; the handle becomes stale.
    pub fn remove(&mut self, handle: Handle) -> Result<Thing> {
        let slot = self.slot_mut(handle).filter(|s| !s.lent).ok_or_else(|| Error::praat(STALE))?;
        let thing = slot.thing.take().ok_or_else(|| Error::praat(STALE))?;
        self.free.push(handle.index);
        Ok(thing)
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.thing.is_some()).count()
    }

    /// Whether the table holds no objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live objects with their handles, oldest slot first.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &Thing)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.thing.as_ref().map(|thing| {
                (
                    Handle {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    thing,
                )
            })
        })
    }

    /// Take the thing out for an environment, keeping its slot reserved.
    fn lend(&mut self, handle: Handle) -> Result<Thing> {
        let slot = self.slot_mut(handle).ok_or_else(|| Error::praat(STALE))?;
        let thing = slot.thing.take().ok_or_else(|| Error::praat(STALE))?;
        slot.lent = true;
        Ok(thing)
    }

    /// Put a lent thing back under its original handle.
    fn restore(&mut self, handle: Handle, thing: Thing) {
        if let Some(slot) = self.slot_mut(handle) {
            slot.thing = Some(thing);
            slot.lent = false;
        }
    }
}

// ========== Environment ==========

/// An entry of the object list.
#[derive(Debug)]
pub struct Entry {
    /// 1-based id, unique within the environment.
    pub id: usize,
    /// The object.
    pub thing: Thing,
    /// Selection flag.
    pub selected: bool,
    /// Handle the thing was lent from, if it came from the host.
    pub origin: Option<Handle>,
}

/// Praat's object list for the duration of one call or script run.
#[derive(Debug, Default)]
pub struct Environment {
    entries: Vec<Entry>,
    /// Lent things that were removed during the call.
    detached: Vec<(Handle, Thing)>,
    next_id: usize,
}

impl Environment {
    /// An empty object list; ids start at 1.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            detached: Vec::new(),
            next_id: 1,
        }
    }

    /// Borrow the objects behind `handles` from `table` and select them.
    ///
    /// Nothing is taken unless every handle is live and appears only once.
    pub fn adopt(table: &mut ObjectTable, handles: &[Handle]) -> Result<Self> {
        for (i, handle) in handles.iter().enumerate() {
            let thing = table.get(*handle)?;
            if handles[..i].contains(handle) {
                praat_bail!("Object {} was given more than once.", thing.full_name());
            }
        }
        let mut env = Self::new();
        for &handle in handles {
            let thing = table.lend(handle)?;
            env.push(thing, Some(handle));
        }
        Ok(env)
    }

    fn push(&mut self, thing: Thing, origin: Option<Handle>) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            thing,
            selected: true,
            origin,
        });
        id
    }

    /// Append a newly created object, selected; returns its id.
    pub fn add_new(&mut self, thing: Thing) -> usize {
        self.push(thing, None)
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    fn position(&self, id: usize) -> Result<usize> {
        self.entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| Error::praat(format!("No object with number {}.", id)))
    }

    /// The entry with `id`.
    pub fn get(&self, id: usize) -> Result<&Thing> {
        Ok(&self.entries[self.position(id)?].thing)
    }

    /// The entry with `id`, mutably.
    pub fn get_mut(&mut self, id: usize) -> Result<&mut Thing> {
        let at = self.position(id)?;
        Ok(&mut self.entries[at].thing)
    }

    /// Ids of the selected objects, oldest first.
    pub fn selected_ids(&self) -> Vec<usize> {
        self.entries.iter().filter(|e| e.selected).map(|e| e.id).collect()
    }

    /// Selected objects of `class` (any class if `None`).
    pub fn selected_of(&self, class: Option<Class>) -> Vec<usize> {
        self.entries
            .iter()
            .filter(|e| e.selected && class.map_or(true, |c| e.thing.class() == c))
            .map(|e| e.id)
            .collect()
    }

    /// Id of the `n`th selected object of `class`; negative `n` counts from the end.
    pub fn selected_nth(&self, class: Option<Class>, n: i64) -> Result<usize> {
        let ids = self.selected_of(class);
        let index = if n < 0 { ids.len() as i64 + n } else { n - 1 };
        let what = class.map_or("object".to_string(), |c| c.to_string());
        if index < 0 || index as usize >= ids.len() {
            praat_bail!("No {} number {} selected.", what, n);
        }
        Ok(ids[index as usize])
    }

    /// Deselect everything.
    pub fn deselect_all(&mut self) {
        for entry in &mut self.entries {
            entry.selected = false;
        }
    }

    /// Select only `id`.
    pub fn select_only(&mut self, id: usize) -> Result<()> {
        let at = self.position(id)?;
        self.deselect_all();
        self.entries[at].selected = true;
        Ok(())
    }

    /// Add `id` to the selection.
    pub fn plus(&mut self, id: usize) -> Result<()> {
        let at = self.position(id)?;
        self.entries[at].selected = true;
        Ok(())
    }

    /// Remove `id` from the selection.
    pub fn minus(&mut self, id: usize) -> Result<()> {
        let at = self.position(id)?;
        self.entries[at].selected = false;
        Ok(())
    }

    /// Select exactly the objects in `ids`.
    pub fn select_by_id(&mut self, ids: &[usize]) -> Result<()> {
        for &id in ids {
            self.position(id)?;
        }
        for entry in &mut self.entries {
            entry.selected = ids.contains(&entry.id);
        }
        Ok(())
    }

    /// Id of the most recent object called `full_name` (`Class "name"` or `Class name`).
    pub fn find_by_full_name(&self, full_name: &str) -> Result<usize> {
        let wanted = full_name.trim();
        let spaced = match wanted.split_once(' ') {
            Some((class, name)) if !name.starts_with('"') => format!("{} \"{}\"", class, name.trim()),
            _ => wanted.to_string(),
        };
        self.entries
            .iter()
            .rev()
            .find(|e| {
                let name = e.thing.full_name();
                name == wanted || name == spaced
            })
            .map(|e| e.id)
            .ok_or_else(|| Error::praat(format!("No object with name \"{}\".", wanted)))
    }

    /// Remove `id` from the list.
    pub fn remove(&mut self, id: usize) -> Result<()> {
        let at = self.position(id)?;
        let entry = self.entries.remove(at);
        if let Some(origin) = entry.origin {
            self.detached.push((origin, entry.thing));
        }
        Ok(())
    }

    /// Remove all selected objects.
    pub fn remove_selected(&mut self) {
        for id in self.selected_ids() {
            // Ids come from the list itself.
            let _ = self.remove(id);
        }
    }

    /// Give lent objects back to `table` and move the selected new ones in.
    ///
    /// Returns the handles of all objects selected at the end, in list
    /// order; unselected new objects are dropped.
    pub fn finish(self, table: &mut ObjectTable) -> Vec<Handle> {
        for (origin, thing) in self.detached {
            table.restore(origin, thing);
        }
        let mut selected = Vec::new();
        for entry in self.entries {
            match entry.origin {
                Some(origin) => {
                    table.restore(origin, entry.thing);
                    if entry.selected {
                        selected.push(origin);
                    }
                }
                None if entry.selected => selected.push(table.insert(entry.thing)),
                None => {}
            }
        }
        selected
    }

    /// Handles of the selected objects that were created during the call.
    pub fn finish_new(self, table: &mut ObjectTable) -> Vec<Handle> {
        let origins: Vec<Handle> = self.entries.iter().filter_map(|e| e.origin).collect();
        self.finish(table)
            .into_iter()
            .filter(|h| !origins.contains(h))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sound(name: &str) -> Thing {
        Thing::new(Sound::from_slice(&[0.0; 10], 10.0), Some(name))
    }

    #[test]
    fn names_are_sanitised() {
        let thing = sound("my sound-1.wav");
        assert_eq!(thing.name(), Some("my_sound_1_wav"));
        assert_eq!(thing.full_name(), "Sound \"my_sound_1_wav\"");
        assert_eq!(Thing::new(PointProcess::empty(0.0, 1.0).unwrap(), None).full_name(), "PointProcess");
    }

    #[test]
    fn stale_handles_are_rejected() {
        let mut table = ObjectTable::new();
        let h = table.insert(sound("a"));
        table.remove(h).unwrap();
        let h2 = table.insert(sound("b"));
        assert_ne!(h, h2);
        assert_eq!(table.get(h).unwrap_err().to_string(), "Object no longer exists.");
        assert_eq!(table.get(h2).unwrap().name(), Some("b"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn lent_objects_come_back() {
        let mut table = ObjectTable::new();
        let a = table.insert(sound("a"));
        let b = table.insert(sound("b"));
        let mut env = Environment::adopt(&mut table, &[a, b]).unwrap();
        assert_eq!(env.selected_ids(), vec![1, 2]);
        assert!(table.get(a).is_err());
        env.remove(1).unwrap();
        env.deselect_all();
        let new = env.add_new(sound("c"));
        assert_eq!(new, 3);
        let selected = env.finish(&mut table);
        assert_eq!(selected.len(), 1);
        assert_eq!(table.get(a).unwrap().name(), Some("a"));
        assert_eq!(table.get(b).unwrap().name(), Some("b"));
        assert_eq!(table.get(selected[0]).unwrap().name(), Some("c"));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn duplicates_are_rejected_without_taking_anything() {
        let mut table = ObjectTable::new();
        let a = table.insert(sound("a"));
        assert!(Environment::adopt(&mut table, &[a, a]).is_err());
        assert!(table.contains(a));
    }

    #[test]
    fn find_by_full_name_prefers_the_newest() {
        let mut env = Environment::new();
        env.add_new(sound("x"));
        env.add_new(sound("x"));
        assert_eq!(env.find_by_full_name("Sound \"x\"").unwrap(), 2);
        assert_eq!(env.find_by_full_name("Sound x").unwrap(), 2);
        assert!(env.find_by_full_name("Pitch x").is_err());
    }

    #[test]
    fn selection_queries() {
        let mut env = Environment::new();
        env.add_new(sound("a"));
        env.add_new(Thing::new(PointProcess::empty(0.0, 1.0).unwrap(), Some("p")));
        env.add_new(sound("b"));
        assert_eq!(env.selected_of(Some(Class::Sound)), vec![1, 3]);
        assert_eq!(env.selected_nth(Some(Class::Sound), -1).unwrap(), 3);
        env.select_only(2).unwrap();
        assert_eq!(env.selected_ids(), vec![2]);
        env.plus(1).unwrap();
        env.minus(2).unwrap();
        assert_eq!(env.selected_ids(), vec![1]);
        assert!(env.selected_nth(Some(Class::Pitch), 1).is_err());
    }
}
