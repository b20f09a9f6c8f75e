//! PointProcess commands, including jitter and the shimmer measures that
//! need a Sound.

use super::decl::*;
use super::{Args, Callback, Command, Cx, Param, Payload};
use crate::error::Result;
use crate::objects::{Class, Thing};
use crate::point_process::{PeriodWindow, PointProcess};
use crate::sound::Sound;

fn period_params() -> Vec<Param> {
    vec![
        real("Start time (s)", "0.0"),
        real("End time (s)", "0.0 (= all)"),
        real("Shortest period (s)", "0.0001"),
        real("Longest period (s)", "0.02"),
        positive("Maximum period factor", "1.3"),
    ]
}

fn shimmer_params() -> Vec<Param> {
    let mut params = period_params();
    params.push(positive("Maximum amplitude factor", "1.6"));
    params
}

fn window(args: &Args) -> Result<PeriodWindow> {
    Ok(PeriodWindow {
        tmin: args.real(0)?,
        tmax: args.real(1)?,
        shortest: args.real(2)?,
        longest: args.real(3)?,
        max_period_factor: args.real(4)?,
    })
}

type Measure = fn(&PointProcess, &PeriodWindow) -> f64;
type AmplitudeMeasure = fn(&PointProcess, &Sound, &PeriodWindow, f64) -> f64;

const JITTERS: &[(&str, &str, Callback)] = &[
    ("Get jitter (local)", "REAL_PointProcess_getJitter_local", jitter_local),
    (
        "Get jitter (local, absolute)",
        "REAL_PointProcess_getJitter_local_absolute",
        jitter_local_absolute,
    ),
    ("Get jitter (rap)", "REAL_PointProcess_getJitter_rap", jitter_rap),
    ("Get jitter (ppq5)", "REAL_PointProcess_getJitter_ppq5", jitter_ppq5),
    ("Get jitter (ddp)", "REAL_PointProcess_getJitter_ddp", jitter_ddp),
];

const SHIMMERS: &[(&str, &str, Callback)] = &[
    ("Get shimmer (local)", "REAL_PointProcess_Sound_getShimmer_local", shimmer_local),
    ("Get shimmer (local_dB)", "REAL_PointProcess_Sound_getShimmer_local_dB", shimmer_local_db),
    ("Get shimmer (apq3)", "REAL_PointProcess_Sound_getShimmer_apq3", shimmer_apq3),
    ("Get shimmer (apq5)", "REAL_PointProcess_Sound_getShimmer_apq5", shimmer_apq5),
    ("Get shimmer (apq11)", "REAL_PointProcess_Sound_getShimmer_apq11", shimmer_apq11),
    ("Get shimmer (dda)", "REAL_PointProcess_Sound_getShimmer_dda", shimmer_dda),
];

pub(super) fn register(commands: &mut Vec<Command>) {
    let pp = || one(Class::PointProcess);

    // Queries
    commands.push(command(
        "Get number of points",
        pp(),
        "INTEGER_PointProcess_getNumberOfPoints",
        vec![],
        get_number_of_points,
    ));
    commands.push(command(
        "Get time from index",
        pp(),
        "REAL_PointProcess_getTimeFromIndex",
        vec![natural("Point number", "10")],
        get_time_from_index,
    ));
    commands.push(command(
        "Get low index",
        pp(),
        "INTEGER_PointProcess_getLowIndex",
        vec![real("Time (s)", "0.5")],
        get_low_index,
    ));
    commands.push(command(
        "Get high index",
        pp(),
        "INTEGER_PointProcess_getHighIndex",
        vec![real("Time (s)", "0.5")],
        get_high_index,
    ));
    commands.push(command(
        "Get nearest index",
        pp(),
        "INTEGER_PointProcess_getNearestIndex",
        vec![real("Time (s)", "0.5")],
        get_nearest_index,
    ));
    commands.push(command(
        "Get interval",
        pp(),
        "REAL_PointProcess_getInterval",
        vec![real("Time (s)", "0.5")],
        get_interval,
    ));
    commands.push(command(
        "Get window points",
        pp(),
        "NUMVEC_PointProcess_getWindowPoints",
        vec![real("Start time (s)", "0.0"), real("End time (s)", "0.0 (= all)")],
        get_window_points,
    ));
    commands.push(command(
        "Get number of periods",
        pp(),
        "INTEGER_PointProcess_getNumberOfPeriods",
        period_params(),
        get_number_of_periods,
    ));
    commands.push(command(
        "Get mean period",
        pp(),
        "REAL_PointProcess_getMeanPeriod",
        period_params(),
        get_mean_period,
    ));
    commands.push(command(
        "Get stdev period",
        pp(),
        "REAL_PointProcess_getStdevPeriod",
        period_params(),
        get_stdev_period,
    ));
    for &(name, callback, run) in JITTERS {
        commands.push(command(name, pp(), callback, period_params(), run));
    }
    commands.push(command(
        "Get count and fraction of voice breaks",
        pp(),
        "NUMVEC_PointProcess_getCountAndFractionOfVoiceBreaks",
        vec![
            real("Start time (s)", "0.0"),
            real("End time (s)", "0.0 (= all)"),
            positive("Maximum period (s)", "0.02"),
        ],
        get_voice_breaks,
    ));
    commands.push(command("List times", pp(), "NUMVEC_PointProcess_listTimes", vec![], list_times));

    // Modifications
    commands.push(command(
        "Add point",
        pp(),
        "MODIFY_PointProcess_addPoint",
        vec![real("Time (s)", "0.5")],
        add_point,
    ));
    commands.push(command(
        "Remove point",
        pp(),
        "MODIFY_PointProcess_removePoint",
        vec![natural("Index", "1")],
        remove_point,
    ));
    commands.push(command(
        "Remove point near",
        pp(),
        "MODIFY_PointProcess_removePointNear",
        vec![real("Time (s)", "0.5")],
        remove_point_near,
    ));
    commands.push(command(
        "Remove points",
        pp(),
        "MODIFY_PointProcess_removePoints",
        vec![natural("From index", "1"), natural("To index", "10")],
        remove_points,
    ));
    commands.push(command(
        "Remove points between",
        pp(),
        "MODIFY_PointProcess_removePointsBetween",
        vec![real("left Time range (s)", "0.3"), real("right Time range (s)", "0.7")],
        remove_points_between,
    ));
    commands.push(command(
        "Fill",
        pp(),
        "MODIFY_PointProcess_fill",
        vec![
            real("Start time (s)", "0.0"),
            real("End time (s)", "0.0 (= all)"),
            positive("Period (s)", "0.01"),
        ],
        fill,
    ));
    commands.push(command(
        "Voice",
        pp(),
        "MODIFY_PointProcess_voice",
        vec![positive("Period (s)", "0.01"), positive("Maximum voiced period (s)", "0.02000000001")],
        voice,
    ));

    // Set operations
    commands.push(command("Union", two(Class::PointProcess), "NEWTIMES2_PointProcesses_union", vec![], union));
    commands.push(command(
        "Intersection",
        two(Class::PointProcess),
        "NEWTIMES2_PointProcesses_intersection",
        vec![],
        intersection,
    ));
    commands.push(command(
        "Difference",
        two(Class::PointProcess),
        "NEWTIMES2_PointProcesses_difference",
        vec![],
        difference,
    ));

    // PointProcess & Sound
    for &(name, callback, run) in SHIMMERS {
        commands.push(command(
            name,
            pair(Class::PointProcess, Class::Sound),
            callback,
            shimmer_params(),
            run,
        ));
    }
}

// ========== Queries ==========

fn get_number_of_points(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    let n = cx.one::<PointProcess>()?.len();
    cx.integer(n as i64, "points")
}

fn get_time_from_index(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let t = cx.one::<PointProcess>()?.time_from_index(args.index(0)?);
    cx.real(t, "seconds")
}

fn get_low_index(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let i = cx.one::<PointProcess>()?.low_index(args.real(0)?);
    cx.integer(i as i64, "")
}

fn get_high_index(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let i = cx.one::<PointProcess>()?.high_index(args.real(0)?);
    cx.integer(i as i64, "")
}

fn get_nearest_index(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let i = cx.one::<PointProcess>()?.nearest_index(args.real(0)?);
    cx.integer(i as i64, "")
}

fn get_interval(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let interval = cx.one::<PointProcess>()?.interval(args.real(0)?);
    cx.real(interval, "seconds")
}

fn get_window_points(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let (first, last) = cx.one::<PointProcess>()?.window_points(args.real(0)?, args.real(1)?);
    Ok(Payload::Vector(ndarray::arr1(&[first as f64, last as f64])))
}

fn get_number_of_periods(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let n = cx.one::<PointProcess>()?.number_of_periods(&window(args)?);
    cx.integer(n as i64, "periods")
}

fn period_measure(cx: &mut Cx<'_>, args: &Args, measure: Measure, unit: &str) -> Result<Payload> {
    let value = measure(cx.one::<PointProcess>()?, &window(args)?);
    cx.real(value, unit)
}

fn get_mean_period(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    period_measure(cx, args, PointProcess::mean_period, "seconds")
}

fn get_stdev_period(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    period_measure(cx, args, PointProcess::stdev_period, "seconds")
}

fn jitter_local(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    period_measure(cx, args, PointProcess::jitter_local, "")
}

fn jitter_local_absolute(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    period_measure(cx, args, PointProcess::jitter_local_absolute, "seconds")
}

fn jitter_rap(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    period_measure(cx, args, PointProcess::jitter_rap, "")
}

fn jitter_ppq5(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    period_measure(cx, args, PointProcess::jitter_ppq5, "")
}

fn jitter_ddp(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    period_measure(cx, args, PointProcess::jitter_ddp, "")
}

fn get_voice_breaks(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    let breaks = cx
        .one::<PointProcess>()?
        .voice_breaks(args.real(0)?, args.real(1)?, args.real(2)?);
    Ok(Payload::Vector(ndarray::arr1(&[
        breaks.count as f64,
        breaks.fraction,
        breaks.duration,
        breaks.analysed,
    ])))
}

fn list_times(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    Ok(Payload::Vector(cx.one::<PointProcess>()?.to_array()))
}

// ========== Modifications ==========

fn add_point(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    cx.one_mut::<PointProcess>()?.add_point(args.real(0)?);
    Ok(Payload::None)
}

fn remove_point(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    cx.one_mut::<PointProcess>()?.remove_point(args.index(0)?);
    Ok(Payload::None)
}

fn remove_point_near(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    cx.one_mut::<PointProcess>()?.remove_point_near(args.real(0)?);
    Ok(Payload::None)
}

fn remove_points(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    cx.one_mut::<PointProcess>()?.remove_points(args.index(0)?, args.index(1)?);
    Ok(Payload::None)
}

fn remove_points_between(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    cx.one_mut::<PointProcess>()?
        .remove_points_between(args.real(0)?, args.real(1)?);
    Ok(Payload::None)
}

fn fill(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    cx.one_mut::<PointProcess>()?
        .fill(args.real(0)?, args.real(1)?, args.real(2)?)?;
    Ok(Payload::None)
}

fn voice(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    cx.one_mut::<PointProcess>()?.voice(args.real(0)?, args.real(1)?)?;
    Ok(Payload::None)
}

// ========== Set operations ==========

fn combine(cx: &mut Cx<'_>, name: &str, op: fn(&PointProcess, &PointProcess) -> PointProcess) -> Result<Payload> {
    let result = op(cx.nth::<PointProcess>(1)?, cx.nth::<PointProcess>(2)?);
    Ok(Payload::Objects(vec![Thing::new(result, Some(name))]))
}

fn union(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    combine(cx, "union", PointProcess::union)
}

fn intersection(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    combine(cx, "intersection", PointProcess::intersection)
}

fn difference(cx: &mut Cx<'_>, _args: &Args) -> Result<Payload> {
    combine(cx, "difference", PointProcess::difference)
}

// ========== Shimmer ==========

fn amplitude_measure(cx: &mut Cx<'_>, args: &Args, measure: AmplitudeMeasure, unit: &str) -> Result<Payload> {
    let w = window(args)?;
    let value = measure(cx.one::<PointProcess>()?, cx.one::<Sound>()?, &w, args.real(5)?);
    cx.real(value, unit)
}

fn shimmer_local(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    amplitude_measure(cx, args, PointProcess::shimmer_local, "")
}

fn shimmer_local_db(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    amplitude_measure(cx, args, PointProcess::shimmer_local_db, "dB")
}

fn shimmer_apq3(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    amplitude_measure(cx, args, PointProcess::shimmer_apq3, "")
}

fn shimmer_apq5(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    amplitude_measure(cx, args, PointProcess::shimmer_apq5, "")
}

fn shimmer_apq11(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    amplitude_measure(cx, args, PointProcess::shimmer_apq11, "")
}

fn shimmer_dda(cx: &mut Cx<'_>, args: &Args) -> Result<Payload> {
    amplitude_measure(cx, args, PointProcess::shimmer_dda, "")
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::commands::{dispatch, lookup};
    use crate::diagnostics::{Melder, SharedBuffer};
    use crate::objects::Environment;
    use crate::value::Value;

    fn run(env: &mut Environment, name: &str, args: &[Value]) -> crate::commands::Reply {
        let mut melder = Melder::new(Box::new(SharedBuffer::new()), Box::new(SharedBuffer::new()));
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);
        dispatch(env, &mut melder, &mut rng, None, name, args, true).unwrap()
    }

    #[test]
    fn fill_then_count() {
        let mut env = Environment::new();
        env.add_new(Thing::new(PointProcess::empty(0.0, 2.0).unwrap(), Some("pp")));
        run(&mut env, "Fill", &[Value::Number(0.5), Value::Number(1.5), Value::Number(0.01)]);
        let reply = run(&mut env, "Get number of points", &[]);
        assert_eq!(reply.info, "100 points\n");
    }

    #[test]
    fn voice_breaks_have_four_values() {
        let mut env = Environment::new();
        let pp = PointProcess::from_times(&[0.1, 0.11, 0.12, 0.5, 0.51], Some((0.0, 1.0))).unwrap();
        env.add_new(Thing::new(pp, Some("pp")));
        let reply = run(&mut env, "Get count and fraction of voice breaks", &[]);
        match reply.payload {
            Payload::Vector(v) => {
                assert_eq!(v.len(), 4);
                assert_eq!(v[0], 1.0);
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn shimmer_takes_six_defaulted_arguments() {
        let command = lookup("Get shimmer (local)", &[Class::PointProcess, Class::Sound]).unwrap();
        assert_eq!(command.params.len(), 6);
        assert!(command.params.iter().all(|p| p.default.is_some()));
        assert!(lookup("Get jitter (local)", &[Class::PointProcess]).is_ok());
    }

    #[test]
    fn union_creates_a_new_process() {
        let mut env = Environment::new();
        env.add_new(Thing::new(PointProcess::from_times(&[0.1, 0.2], Some((0.0, 1.0))).unwrap(), None));
        env.add_new(Thing::new(PointProcess::from_times(&[0.2, 0.3], Some((0.0, 1.0))).unwrap(), None));
        env.select_by_id(&[1, 2]).unwrap();
        let reply = run(&mut env, "Union", &[]);
        assert_eq!(reply.created, vec![3]);
        assert_eq!(env.get(3).unwrap().downcast::<PointProcess>().unwrap().len(), 3);
    }
}
