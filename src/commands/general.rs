//! Menu commands, commands for any object, and queries shared by every
//! sampled class.

use std::path::Path;

use super::decl::*;
use super::{Args, Command, Count, Cx, Payload};
use crate::error::{Error, Result};
use crate::interpreter::Formula;
use crate::matrix::{Axis, Cell, Matrix};
use crate::objects::{Class, Thing};
use crate::persist;
use crate::point_process::PointProcess;
use crate::sampled::Sampled;
use crate::sound::Sound;
use crate::textgrid::TextGrid;

pub(super) fn register(commands: &mut Vec<Command>) {
    // Menu
    commands.push(command(
        "Read from file",
        None,
        "READ1_Data_readFromFile",
        vec![required(text("File name", ""))],
        read_from_file,
    ));
    commands.push(command(
        "Create Sound from formula",
        None,
        "NEW1_Sound_createFromFormula",
        vec![
            word("Name", "sineWithNoise"),
            natural("Number of channels", "1"),
            real("Start time (s)", "0.0"),
            real("End time (s)", "1.0"),
            positive("Sampling frequency (Hz)", "44100"),
            text("Formula", "1/2 * sin(2*pi*377*x) + randomGauss(0,0.1)"),
        ],
        create_sound_from_formula,
    ));
    commands.push(command(
        "Create TextGrid",
        None,
        "NEW1_TextGrid_create",
        vec![
            real("Start time (s)", "0.0"),
            real("End time (s)", "1.0"),
            sentence("All tier names", "Mary John bell"),
            sentence("Which of these are point tiers?", "bell"),
        ],
        create_textgrid,
    ));
    commands.push(command(
        "Create PointProcess (empty)",
        None,
        "NEW1_PointProcess_createEmpty",
        vec![
            word("Name", "empty"),
            real("Start time (s)", "0.0"),
            real("End time (s)", "1.0"),
        ],
        create_empty_point_process,
    ));
    commands.push(command(
        "Create Poisson process",
        None,
        "NEW1_PointProcess_createPoissonProcess",
        vec![
            word("Name", "poisson"),
            real("Start time (s)", "0.0"),
            real("End time (s)", "1.0"),
            positive("Density (/s)", "100.0"),
        ],
        create_poisson_process,
    ));
    commands.push(command(
        "Create Matrix",
        None,
        "NEW1_Matrix_create",
        vec![
            word("Name", "xy"),
            real("xmin", "1.0"),
            real("xmax", "1.0"),
            natural("Number of columns", "1"),
            positive("dx", "1.0"),
            real("x1", "1.0"),
            real("ymin", "1.0"),
            real("ymax", "1.0"),
            natural("Number of rows", "1"),
            positive("dy", "1.0"),
            real("y1", "1.0"),
            text("Formula", "x*y"),
        ],
        create_matrix,
    ));
    commands.push(command(
        "Read Matrix from raw text file",
        None,
        "READ1_Matrix_readFromRawTextFile",
        vec![required(text("File name", ""))],
        read_matrix_from_raw_text_file,
    ));
    commands.push(command(
        "Report system properties",
        None,
        "INFO_Praat_reportSystemProperties",
        vec![],
        report_system_properties,
    ));

    // Any object
    commands.push(command("Get name", any(Count::One), "INFO_Thing_getName", vec![], get_name));
    commands.push(command("Info", any(Count::One), "INFO_Thing_info", vec![], info));
    commands.push(command(
        "Rename",
        any(Count::One),
        "MODIFY_Thing_rename",
        vec![required(sentence("New name", ""))],
        rename,
    ));
    commands.push(command(
        "Copy",
        any(Count::One),
        "NEW_Thing_copy",
        vec![sentence("Name", "")],
        copy,
    ));
    commands.push(command("Remove", any(Count::Many), "PRAAT_Thing_remove", vec![], remove));
    commands.push(command(
        "Save as text file",
        any(Count::Many),
        "SAVE_Data_writeToTextFile",
        vec![required(text("File name", ""))],
        save_as_text_file,
    ));

    // Every sampled class
    for class in [
        Class::Sound,
        Class::Intensity,
        Class::Pitch,
        Class::Spectrogram,
        Class::Matrix,
        Class::Formant,
        Class::Harmonicity,
    ] {
        commands.push(command("Get start time", one(class), "REAL_Sampled_getStartTime", vec![], get_start_time));
        commands.push(command("Get end time", one(class), "REAL_Sampled_getEndTime", vec![], get_end_time));
        commands.push(command(
            "Get total duration",
            one(class),
            "REAL_Sampled_getTotalDuration",
            vec![],
            get_total_duration,
        ));
        commands.push(command(
            "Get number of frames",
            one(class),
            "INTEGER_Sampled_getNumberOfFrames",
            vec![],
            get_number_of_frames,
        ));
        commands.push(command("Get time step", one(class), "REAL_Sampled_getTimeStep", vec![], get_time_step));
        commands.push(command(
            "Get time from frame number",
            one(class),
            "REAL_Sampled_getTimeFromFrame",
            vec![natural("Frame number", "1")],
            get_time_from_frame,
        ));
        commands.push(command(
            "Get frame number from time",
            one(class),
            "REAL_Sampled_getFrameFromTime",
            vec![real("Time (s)", "0.5")],
            get_frame_from_time,
        ));
        commands.push(command(
            "List frame times",
            one(class),
            "NUMVEC_Sampled_listAllFrameTimes",
            vec![],
            list_frame_times,
        ));
    }
}

fn new_object(object: impl Into<crate::objects::Object>, name: &str) -> Payload {
    Payload::Objects(vec![Thing::new(object, Some(name))])
}

fn file_stem(path: &str) -> Option<String> {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
}

// ========== Menu ==========

fn read_from_file(_cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    Ok(Payload::Objects(persist::read_file(args.text(0)?)?))
}

fn create_sound_from_formula(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let name = args.text(0)?.to_string();
    let channels = args.index(1)?;
    let (start, end, rate) = (args.real(2)?, args.real(3)?, args.real(4)?);
    let formula = Formula::parse(args.text(5)?)?;
    let mut sound = Sound::zeros(channels, start, end, rate)?;
    let times = sound.xs();
    for ((channel, i), value) in sound.values_mut().indexed_iter_mut() {
        let cell = Cell {
            row: channel + 1,
            col: i + 1,
            x: times[i],
            y: (channel + 1) as f64,
            value: *value,
        };
        *value = formula.cell_value(&mut *cx, cell)?;
    }
    Ok(new_object(sound, &name))
}

fn create_textgrid(_cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let names = args.text(2)?;
    let tg = TextGrid::from_names(args.real(0)?, args.real(1)?, names, args.text(3)?)?;
    Ok(new_object(tg, names))
}

fn create_empty_point_process(_cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let pp = PointProcess::empty(args.real(1)?, args.real(2)?)?;
    Ok(new_object(pp, args.text(0)?))
}

fn create_poisson_process(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let pp = PointProcess::poisson(&mut *cx.rng, args.real(1)?, args.real(2)?, args.real(3)?)?;
    Ok(new_object(pp, args.text(0)?))
}

fn create_matrix(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let x = Axis {
        min: args.real(1)?,
        max: args.real(2)?,
        step: args.real(4)?,
        first: args.real(5)?,
    };
    let y = Axis {
        min: args.real(6)?,
        max: args.real(7)?,
        step: args.real(9)?,
        first: args.real(10)?,
    };
    let mut matrix = Matrix::zeros(x, args.index(3)?, y, args.index(8)?)?;
    let formula = Formula::parse(args.text(11)?)?;
    matrix.apply_formula(|cell| formula.cell_value(&mut *cx, *cell))?;
    Ok(new_object(matrix, args.text(0)?))
}

fn read_matrix_from_raw_text_file(_cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let path = args.text(0)?;
    let matrix = Matrix::read_raw_text(path)?;
    Ok(Payload::Objects(vec![Thing::new(matrix, file_stem(path).as_deref())]))
}

fn report_system_properties(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    cx.melder.append_info_line(&format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")));
    cx.melder.append_info_line(&format!(
        "Platform: {} ({})",
        std::env::consts::OS,
        std::env::consts::ARCH
    ));
    cx.melder.append_info_line(&format!("Registered commands: {}", super::registry().len()));
    Ok(Payload::None)
}

// ========== Any object ==========

fn get_name(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    let name = cx.any()?.name().unwrap_or_default().to_string();
    cx.string(&name)
}

fn info(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    let text = cx.any()?.info();
    cx.melder.write_info(&text);
    Ok(Payload::None)
}

fn rename(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let id = cx.env.selected_nth(None, 1)?;
    cx.env.get_mut(id)?.set_name(Some(args.text(0)?));
    Ok(Payload::None)
}

fn copy(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let original = cx.any()?;
    let name = match args.text(0)? {
        "" => original.name().map(str::to_string),
        given => Some(given.to_string()),
    };
    let object = original.object().clone();
    Ok(Payload::Objects(vec![Thing::new(object, name.as_deref())]))
}

fn remove(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    cx.env.remove_selected();
    Ok(Payload::None)
}

fn save_as_text_file(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let things = cx
        .env
        .selected_ids()
        .into_iter()
        .map(|id| cx.env.get(id))
        .collect::<Result<Vec<&Thing>>>()?;
    persist::save_text_file(args.text(0)?, &things)?;
    Ok(Payload::None)
}

// ========== Sampled ==========

fn sampled<'c>(cx: &'c Cx<'_>) -> Result<&'c dyn Sampled> {
    let thing = cx.any()?;
    thing
        .object()
        .as_sampled()
        .ok_or_else(|| Error::praat(format!("{} is not a sampled object.", thing.full_name())))
}

fn get_start_time(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    let x = sampled(cx)?.xmin();
    cx.real(x, "seconds")
}

fn get_end_time(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    let x = sampled(cx)?.xmax();
    cx.real(x, "seconds")
}

fn get_total_duration(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    let x = sampled(cx)?.total_duration();
    cx.real(x, "seconds")
}

fn get_number_of_frames(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    let n = sampled(cx)?.nx();
    cx.integer(n as i64, "frames")
}

fn get_time_step(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    let x = sampled(cx)?.dx();
    cx.real(x, "seconds")
}

fn get_time_from_frame(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let x = sampled(cx)?.frame_to_x(args.real(0)?);
    cx.real(x, "seconds")
}

fn get_frame_from_time(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let frame = sampled(cx)?.x_to_frame(args.real(0)?);
    cx.real(frame, "")
}

fn list_frame_times(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    Ok(Payload::Vector(sampled(cx)?.xs()))
}
