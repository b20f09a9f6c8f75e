//! TextGrid commands.

use super::decl::*;
use super::{Args, Command, Cx, Payload};
use crate::error::Result;
use crate::objects::{Class, Thing};
use crate::sound::Sound;
use crate::textgrid::TextGrid;

pub(super) fn register(commands: &mut Vec<Command>) {
    let tg = || one(Class::TextGrid);

    commands.push(command(
        "Get number of tiers",
        tg(),
        "INTEGER_TextGrid_getNumberOfTiers",
        vec![],
        get_number_of_tiers,
    ));
    commands.push(command(
        "Get tier name",
        tg(),
        "INFO_TextGrid_getTierName",
        vec![natural("Tier number", "1")],
        get_tier_name,
    ));
    commands.push(command(
        "Is interval tier",
        tg(),
        "BOOLEAN_TextGrid_isIntervalTier",
        vec![natural("Tier number", "1")],
        is_interval_tier,
    ));
    commands.push(command("Get tier names", tg(), "STRVEC_TextGrid_getTierNames", vec![], get_tier_names));
    commands.push(command(
        "Get number of intervals",
        tg(),
        "INTEGER_TextGrid_getNumberOfIntervals",
        vec![natural("Tier number", "1")],
        get_number_of_intervals,
    ));
    commands.push(command(
        "Get label of interval",
        tg(),
        "INFO_TextGrid_getLabelOfInterval",
        vec![natural("Tier number", "1"), natural("Interval number", "1")],
        get_label_of_interval,
    ));
    commands.push(command(
        "Get start time of interval",
        tg(),
        "REAL_TextGrid_getStartTimeOfInterval",
        vec![natural("Tier number", "1"), natural("Interval number", "1")],
        get_start_time_of_interval,
    ));
    commands.push(command(
        "Get end time of interval",
        tg(),
        "REAL_TextGrid_getEndTimeOfInterval",
        vec![natural("Tier number", "1"), natural("Interval number", "1")],
        get_end_time_of_interval,
    ));
    commands.push(command(
        "Get number of points",
        tg(),
        "INTEGER_TextGrid_getNumberOfPoints",
        vec![natural("Tier number", "1")],
        get_number_of_points,
    ));
    commands.push(command(
        "Get label of point",
        tg(),
        "INFO_TextGrid_getLabelOfPoint",
        vec![natural("Tier number", "1"), natural("Point number", "1")],
        get_label_of_point,
    ));
    commands.push(command(
        "Insert boundary",
        tg(),
        "MODIFY_TextGrid_insertBoundary",
        vec![natural("Tier number", "1"), real("Time (s)", "0.5")],
        insert_boundary,
    ));
    commands.push(command(
        "Set interval text",
        tg(),
        "MODIFY_TextGrid_setIntervalText",
        vec![natural("Tier number", "1"), natural("Interval number", "1"), text("Text", "")],
        set_interval_text,
    ));
    commands.push(command(
        "Insert point",
        tg(),
        "MODIFY_TextGrid_insertPoint",
        vec![natural("Tier number", "1"), real("Time (s)", "0.5"), text("Label", "")],
        insert_point,
    ));
    commands.push(command(
        "Extract non-empty intervals",
        pair(Class::TextGrid, Class::Sound),
        "NEWMANY_TextGrid_Sound_extractNonemptyIntervals",
        vec![natural("Tier number", "1"), boolean("Preserve times", false)],
        extract_non_empty_intervals,
    ));
}

fn get_number_of_tiers(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    let n = cx.one::<TextGrid>()?.n_tiers();
    cx.integer(n as i64, "tiers")
}

fn get_tier_name(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let name = cx.one::<TextGrid>()?.tier(args.index(0)?)?.name.clone();
    cx.string(&name)
}

fn is_interval_tier(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let yes = cx.one::<TextGrid>()?.tier(args.index(0)?)?.is_interval_tier();
    cx.boolean(yes, "")
}

fn get_tier_names(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    Ok(Payload::StringVector(cx.one::<TextGrid>()?.tier_names()))
}

fn get_number_of_intervals(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let n = cx.one::<TextGrid>()?.n_intervals(args.index(0)?)?;
    cx.integer(n as i64, "intervals")
}

fn get_label_of_interval(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let label = cx
        .one::<TextGrid>()?
        .interval(args.index(0)?, args.index(1)?)?
        .text
        .clone();
    cx.string(&label)
}

fn get_start_time_of_interval(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let t = cx.one::<TextGrid>()?.interval(args.index(0)?, args.index(1)?)?.xmin;
    cx.real(t, "seconds")
}

fn get_end_time_of_interval(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let t = cx.one::<TextGrid>()?.interval(args.index(0)?, args.index(1)?)?.xmax;
    cx.real(t, "seconds")
}

fn get_number_of_points(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let n = cx.one::<TextGrid>()?.n_points(args.index(0)?)?;
    cx.integer(n as i64, "points")
}

fn get_label_of_point(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let mark = cx
        .one::<TextGrid>()?
        .point(args.index(0)?, args.index(1)?)?
        .mark
        .clone();
    cx.string(&mark)
}

fn insert_boundary(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    cx.one_mut::<TextGrid>()?
        .insert_boundary(args.index(0)?, args.real(1)?)?;
    Ok(Payload::None)
}

fn set_interval_text(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    cx.one_mut::<TextGrid>()?
        .set_interval_text(args.index(0)?, args.index(1)?, args.text(2)?)?;
    Ok(Payload::None)
}

fn insert_point(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    cx.one_mut::<TextGrid>()?
        .insert_point(args.index(0)?, args.real(1)?, args.text(2)?)?;
    Ok(Payload::None)
}

fn extract_non_empty_intervals(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let parts = cx.one::<TextGrid>()?.extract_non_empty_intervals(
        cx.one::<Sound>()?,
        args.index(0)?,
        args.boolean(1)?,
    )?;
    if parts.is_empty() {
        cx.melder.warn("No non-empty intervals were found.")?;
    }
    let things = parts
        .into_iter()
        .map(|(label, part)| Thing::new(part, Some(&label)))
        .collect();
    Ok(Payload::Objects(things))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::commands::dispatch;
    use crate::diagnostics::{Melder, SharedBuffer};
    use crate::objects::Environment;
    use crate::value::{Outcome, Value};

    fn setup() -> (Environment, Melder, rand::rngs::StdRng) {
        let mut env = Environment::new();
        env.add_new(Thing::new(
            TextGrid::from_names(0.0, 1.0, "words bell", "bell").unwrap(),
            Some("tg"),
        ));
        env.add_new(Thing::new(Sound::from_slice(&vec![0.1; 1000], 1000.0), Some("s")));
        env.select_by_id(&[1]).unwrap();
        let melder = Melder::new(Box::new(SharedBuffer::new()), Box::new(SharedBuffer::new()));
        (env, melder, rand::rngs::StdRng::seed_from_u64(0))
    }

    #[test]
    fn tier_queries() {
        let (mut env, mut melder, mut rng) = setup();
        let reply = dispatch(&mut env, &mut melder, &mut rng, None, "Get tier names", &[], true).unwrap();
        assert_eq!(
            reply.into_outcome(vec![]),
            Outcome::StringVector(vec!["words".into(), "bell".into()])
        );
        let reply = dispatch(&mut env, &mut melder, &mut rng, None, "Is interval tier", &[Value::Number(2.0)], true).unwrap();
        assert_eq!(reply.into_outcome(vec![]), Outcome::Boolean(false));
    }

    #[test]
    fn empty_extraction_warns() {
        let (mut env, mut melder, mut rng) = setup();
        env.select_by_id(&[1, 2]).unwrap();
        let reply = dispatch(&mut env, &mut melder, &mut rng, None, "Extract non-empty intervals", &[], true).unwrap();
        assert!(reply.created.is_empty());
        let warnings = melder.take_warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].message(), "No non-empty intervals were found.");
    }

    #[test]
    fn labelled_intervals_become_sounds() {
        let (mut env, mut melder, mut rng) = setup();
        let args = [Value::Number(1.0), Value::Number(0.4)];
        dispatch(&mut env, &mut melder, &mut rng, None, "Insert boundary", &args, true).unwrap();
        let args = [Value::Number(1.0), Value::Number(2.0), Value::from("hello")];
        dispatch(&mut env, &mut melder, &mut rng, None, "Set interval text", &args, true).unwrap();
        env.select_by_id(&[1, 2]).unwrap();
        let reply = dispatch(&mut env, &mut melder, &mut rng, None, "Extract non-empty intervals", &[], true).unwrap();
        assert_eq!(reply.created.len(), 1);
        assert_eq!(env.get(reply.created[0]).unwrap().name(), Some("hello"));
    }
}
