use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chimp::{Drag, Point, PressType, TransferError};

use super::*;
use crate::response::Status;
use crate::testing::{ConnectOutcome, DeviceAction, FakeDevice, FakeDriver};

const GATED: &[&str] = &[
	"/dispose",
	"/reboot",
	"/wake",
	"/install?apk=/tmp/app.apk",
	"/remove?pkg=com.example",
	"/pull?src=/sdcard/a&dst=/tmp/a",
	"/push?src=/tmp/a&dst=/sdcard/a",
	"/getVar?var=build.model",
	"/getProp?prop=ro.product.model",
	"/type?s=hello",
	"/press",
	"/touch?x=1&y=2",
	"/drag",
	"/takeSnapshot?path=/tmp/s.png&format=png",
	"/shell",
];

fn fast_policy() -> InitPolicy {
	InitPolicy {
		default_timeout: Duration::from_millis(5_000),
		attempt_interval: Duration::from_millis(1_000),
		..InitPolicy::default()
	}
}

fn dispatcher_with(driver: FakeDriver) -> (Dispatcher, Arc<FakeDriver>, FakeDevice) {
	dispatcher_with_policy(driver, fast_policy())
}

fn dispatcher_with_policy(driver: FakeDriver, policy: InitPolicy) -> (Dispatcher, Arc<FakeDriver>, FakeDevice) {
	let driver = Arc::new(driver);
	let device = driver.device();
	let dispatcher = Dispatcher::new(driver.clone(), policy);
	(dispatcher, driver, device)
}

async fn connected() -> (Dispatcher, Arc<FakeDriver>, FakeDevice) {
	let policy = InitPolicy {
		attempt_interval: Duration::ZERO,
		..fast_policy()
	};
	let (dispatcher, driver, device) = dispatcher_with_policy(FakeDriver::new(), policy);
	let response = dispatcher.handle(CommandRequest::get("/init")).await;
	assert_eq!(response, CommandResponse::ok("connected"));
	(dispatcher, driver, device)
}

async fn get(dispatcher: &Dispatcher, path: &str) -> CommandResponse {
	dispatcher.handle(CommandRequest::get(path)).await
}

#[tokio::test]
async fn root_serves_banner_without_session() {
	let (dispatcher, driver, _) = dispatcher_with(FakeDriver::new());
	assert_eq!(get(&dispatcher, "/").await, CommandResponse::ok(BANNER));
	assert_eq!(get(&dispatcher, "/favicon.ico").await, CommandResponse::ok(""));
	assert_eq!(driver.connects(), 0);
}

#[tokio::test]
async fn unknown_command_is_not_found() {
	let (dispatcher, ..) = connected().await;
	let response = get(&dispatcher, "/fly").await;
	assert_eq!(response.status, Status::NotFound);
	assert_eq!(response.body, "not supported.");
}

#[tokio::test]
async fn gated_commands_are_rejected_without_session() {
	let (dispatcher, driver, device) = dispatcher_with(FakeDriver::new());

	for path in GATED {
		let response = get(&dispatcher, path).await;
		assert_eq!(response.status, Status::Forbidden, "{path}");
		assert_eq!(response.body, "device not connected.", "{path}");
	}
	let response = dispatcher.handle(CommandRequest::post("/shell", "ls")).await;
	assert_eq!(response.status, Status::Forbidden);

	assert_eq!(driver.connects(), 0);
	assert!(device.actions().is_empty());
}

#[tokio::test]
async fn gate_runs_before_parameter_validation() {
	let (dispatcher, ..) = dispatcher_with(FakeDriver::new());
	let response = get(&dispatcher, "/touch?x=abc").await;
	assert_eq!(response.status, Status::Forbidden);
}

#[tokio::test]
async fn init_is_idempotent_while_connected() {
	let (dispatcher, driver, _) = connected().await;

	let response = get(&dispatcher, "/init?timeout=notanumber").await;
	assert_eq!(response, CommandResponse::ok("already connected"));
	assert_eq!(driver.connects(), 1);
	assert_eq!(dispatcher.session.read().await.as_ref().map(|s| s.model().to_string()), Some("Pixel".into()));
}

#[tokio::test]
async fn dispose_clears_session_once() {
	let (dispatcher, _, device) = connected().await;

	assert_eq!(get(&dispatcher, "/dispose").await, CommandResponse::ok("disposed"));
	assert_eq!(device.dispose_count(), 1);
	assert!(!dispatcher.is_connected().await);

	assert_eq!(get(&dispatcher, "/wake").await.status, Status::Forbidden);
	assert_eq!(get(&dispatcher, "/dispose").await.status, Status::Forbidden);
	assert_eq!(device.dispose_count(), 1);
}

#[tokio::test]
async fn simple_commands_report_fixed_bodies() {
	let (dispatcher, _, device) = connected().await;

	assert_eq!(get(&dispatcher, "/reboot?into=bootloader").await.body, "rebooted");
	assert_eq!(get(&dispatcher, "/reboot").await.body, "rebooted");
	assert_eq!(get(&dispatcher, "/wake").await.body, "morning");
	assert_eq!(get(&dispatcher, "/install?apk=/tmp/app.apk").await.body, "installed");
	assert_eq!(get(&dispatcher, "/type?s=hello%20world").await.body, "typed");

	let actions = device.actions();
	assert!(actions.contains(&DeviceAction::Reboot(Some("bootloader".into()))));
	assert!(actions.contains(&DeviceAction::Reboot(None)));
	assert!(actions.contains(&DeviceAction::Wake));
	assert!(actions.contains(&DeviceAction::Install(PathBuf::from("/tmp/app.apk"))));
	assert!(actions.contains(&DeviceAction::Type("hello world".into())));
}

#[tokio::test]
async fn remove_failure_is_data_not_error() {
	let (dispatcher, _, device) = connected().await;

	assert_eq!(get(&dispatcher, "/remove?pkg=com.example").await, CommandResponse::ok("true"));
	device.set_remove_result(false);
	assert_eq!(get(&dispatcher, "/remove?pkg=com.example").await, CommandResponse::ok("false"));
}

#[tokio::test]
async fn missing_required_params_are_bad_requests() {
	let (dispatcher, _, device) = connected().await;
	let before = device.side_effects();

	for path in ["/install", "/remove", "/pull?src=/a", "/push?dst=/a", "/getVar", "/getProp", "/type", "/takeSnapshot?path=/tmp/x.png"] {
		let response = get(&dispatcher, path).await;
		assert_eq!(response.status, Status::BadRequest, "{path}");
	}
	assert_eq!(device.side_effects(), before);
}

#[tokio::test]
async fn transfers_map_each_error_category() {
	let (dispatcher, _, device) = connected().await;

	assert_eq!(get(&dispatcher, "/pull?src=/sdcard/a&dst=/tmp/a").await, CommandResponse::ok("done"));
	assert_eq!(get(&dispatcher, "/push?src=/tmp/a&dst=/sdcard/a").await, CommandResponse::ok("done"));

	let cases = [
		(TransferError::Io("disk full".into()), "IoError: disk full"),
		(TransferError::CommandRejected("device offline".into()), "CommandRejected: device offline"),
		(TransferError::Timeout("after 300s".into()), "Timeout: after 300s"),
		(TransferError::Sync("remote object does not exist".into()), "SyncError: remote object does not exist"),
	];
	for (error, expected) in cases {
		device.set_transfer_error(Some(error));
		for path in ["/pull?src=/sdcard/a&dst=/tmp/a", "/push?src=/tmp/a&dst=/sdcard/a"] {
			let response = get(&dispatcher, path).await;
			assert_eq!(response.status, Status::InternalError);
			assert_eq!(response.body, format!("SERVER INTERNAL ERROR: {expected}"));
		}
	}
}

#[tokio::test]
async fn properties_and_variables_return_raw_values() {
	let (dispatcher, _, device) = connected().await;
	device.set_variable("build.display", " UP1A.231005 ");

	assert_eq!(get(&dispatcher, "/getProp?prop=ro.product.model").await.body, "Pixel");
	assert_eq!(get(&dispatcher, "/getProp?prop=unknown").await, CommandResponse::ok(""));
	assert_eq!(get(&dispatcher, "/getVar?var=build.display").await.body, " UP1A.231005 ");
}

#[tokio::test]
async fn press_defaults_and_rejects_unknown_type() {
	let (dispatcher, _, device) = connected().await;

	assert_eq!(get(&dispatcher, "/press").await.body, "sent");
	assert_eq!(get(&dispatcher, "/press?keyname=KEYCODE_MENU&t=down").await.body, "sent");
	assert_eq!(get(&dispatcher, "/press?t=move").await, CommandResponse::ok("sent"));
	let response = get(&dispatcher, "/press?t=sideways").await;
	assert_eq!(response.status, Status::BadRequest);

	let presses: Vec<_> = device
		.actions()
		.into_iter()
		.filter(|action| matches!(action, DeviceAction::Press { .. }))
		.collect();
	assert_eq!(
		presses,
		vec![
			DeviceAction::Press {
				key: "KEYCODE_HOME".into(),
				kind: PressType::DownAndUp
			},
			DeviceAction::Press {
				key: "KEYCODE_MENU".into(),
				kind: PressType::Down
			},
			DeviceAction::Press {
				key: "KEYCODE_HOME".into(),
				kind: PressType::Move
			},
		]
	);
}

#[tokio::test]
async fn touch_parses_coordinates_strictly() {
	let (dispatcher, _, device) = connected().await;

	assert_eq!(get(&dispatcher, "/touch").await.body, "sent");
	assert_eq!(get(&dispatcher, "/touch?x=10&y=-20&t=move").await.body, "sent");

	let response = get(&dispatcher, "/touch?x=ten").await;
	assert_eq!(response.status, Status::BadRequest);
	assert!(response.body.contains("'x'"), "{}", response.body);

	let touches: Vec<_> = device
		.actions()
		.into_iter()
		.filter(|action| matches!(action, DeviceAction::Touch { .. }))
		.collect();
	assert_eq!(
		touches,
		vec![
			DeviceAction::Touch {
				x: 0,
				y: 0,
				kind: PressType::DownAndUp
			},
			DeviceAction::Touch {
				x: 10,
				y: -20,
				kind: PressType::Move
			},
		]
	);
}

#[tokio::test]
async fn drag_uses_defaults_and_surfaces_failures() {
	let (dispatcher, _, device) = connected().await;

	assert_eq!(get(&dispatcher, "/drag").await, CommandResponse::ok("sent"));
	assert!(device.actions().contains(&DeviceAction::Drag(Drag {
		start: Point::new(0, 0),
		end: Point::new(200, 200),
		steps: 10,
		duration: Duration::from_millis(100),
	})));

	device.set_fail_drag(true);
	let response = get(&dispatcher, "/drag?startx=5&steps=3").await;
	assert_eq!(response.status, Status::InternalError);
	assert!(response.body.starts_with("SERVER INTERNAL ERROR: "));

	assert_eq!(get(&dispatcher, "/drag?steps=-1").await.status, Status::BadRequest);
}

#[tokio::test]
async fn drag_rejects_oversized_steps_and_duration() {
	let (dispatcher, _, device) = connected().await;

	let response = get(&dispatcher, "/drag?steps=4294967295").await;
	assert_eq!(response.status, Status::BadRequest);
	assert!(response.body.contains("steps"), "unexpected body: {}", response.body);
	let response = get(&dispatcher, "/drag?ms=99999999999").await;
	assert_eq!(response.status, Status::BadRequest);
	assert!(response.body.contains("ms"), "unexpected body: {}", response.body);
	assert!(!device.actions().iter().any(|action| matches!(action, DeviceAction::Drag(_))));

	let at_limit = format!("/drag?steps={}&ms={}", Drag::MAX_STEPS, Drag::MAX_DURATION.as_millis());
	assert_eq!(get(&dispatcher, &at_limit).await, CommandResponse::ok("sent"));
	assert!(device.actions().contains(&DeviceAction::Drag(Drag {
		start: Point::new(0, 0),
		end: Point::new(200, 200),
		steps: Drag::MAX_STEPS,
		duration: Drag::MAX_DURATION,
	})));
}

#[tokio::test]
async fn snapshot_is_written_in_requested_format() {
	let (dispatcher, _, device) = connected().await;
	let dir = tempfile::tempdir().unwrap();
	let png = dir.path().join("screen.png");
	let jpg = dir.path().join("screen.jpg");

	let response = get(&dispatcher, &format!("/takeSnapshot?path={}&format=png", png.display())).await;
	assert_eq!(response, CommandResponse::ok("taken"));
	assert!(std::fs::read(&png).unwrap().starts_with(b"\x89PNG"));

	let response = get(&dispatcher, &format!("/takeSnapshot?path={}&format=jpg", jpg.display())).await;
	assert_eq!(response, CommandResponse::ok("taken"));
	assert!(std::fs::read(&jpg).unwrap().starts_with(&[0xFF, 0xD8]));

	let response = get(&dispatcher, &format!("/takeSnapshot?path={}&format=xyz", png.display())).await;
	assert_eq!(response.status, Status::InternalError);
	assert_eq!(device.actions().iter().filter(|a| **a == DeviceAction::Snapshot).count(), 3);
}

#[tokio::test]
async fn shell_requires_post_body() {
	let (dispatcher, _, device) = connected().await;
	device.set_shell_output("hi\n");

	let response = get(&dispatcher, "/shell").await;
	assert_eq!(response.status, Status::MethodNotAllowed);
	assert_eq!(response.body, "use POST");

	let response = dispatcher.handle(CommandRequest::post("/shell", "echo hi")).await;
	assert_eq!(response, CommandResponse::ok("hi\n"));

	let response = dispatcher.handle(CommandRequest::post("/shell", "")).await;
	assert_eq!(response.status, Status::Ok);
	assert!(device.actions().contains(&DeviceAction::Shell(String::new())));
}

#[tokio::test(start_paused = true)]
async fn init_retries_until_probe_is_non_blank() {
	let (dispatcher, driver, device) = dispatcher_with(FakeDriver::scripted([
		ConnectOutcome::Blank,
		ConnectOutcome::Fail,
		ConnectOutcome::Ready("Pixel 8".into()),
	]));

	let response = get(&dispatcher, "/init?timeout=5000&serialno=.*").await;
	assert_eq!(response, CommandResponse::ok("connected"));
	assert_eq!(driver.connects(), 3);
	// The blank candidate was released before retrying.
	assert_eq!(device.dispose_count(), 1);
	assert!(dispatcher.is_connected().await);
}

#[tokio::test(start_paused = true)]
async fn init_gives_up_when_budget_is_spent() {
	let (dispatcher, driver, device) = dispatcher_with(FakeDriver::scripted([ConnectOutcome::Blank]));
	let started = tokio::time::Instant::now();

	let response = get(&dispatcher, "/init?timeout=5000").await;
	assert_eq!(response.status, Status::InternalError);
	assert!(response.body.contains("not connected within timeout"), "{}", response.body);
	assert!(!dispatcher.is_connected().await);

	// One attempt per second of budget.
	assert_eq!(driver.connects(), 5);
	assert_eq!(device.dispose_count(), 5);
	assert!(started.elapsed() >= Duration::from_millis(5_000));
}

#[tokio::test(start_paused = true)]
async fn init_attempts_once_even_with_zero_timeout() {
	let (dispatcher, driver, _) = dispatcher_with(FakeDriver::scripted([ConnectOutcome::Fail]));

	let response = get(&dispatcher, "/init?timeout=0").await;
	assert_eq!(response.status, Status::InternalError);
	assert_eq!(driver.connects(), 1);
}

#[tokio::test(start_paused = true)]
async fn init_uses_policy_timeout_by_default() {
	let (dispatcher, driver, _) = dispatcher_with(FakeDriver::scripted([ConnectOutcome::Fail]));

	get(&dispatcher, "/init").await;
	assert_eq!(driver.connects(), 5);
}

#[tokio::test]
async fn init_rejects_bad_parameters() {
	let (dispatcher, driver, _) = dispatcher_with(FakeDriver::new());

	assert_eq!(get(&dispatcher, "/init?timeout=soon").await.status, Status::BadRequest);
	assert_eq!(get(&dispatcher, "/init?serialno=emulator-(").await.status, Status::BadRequest);
	assert_eq!(driver.connects(), 0);
}

#[tokio::test(start_paused = true)]
async fn init_with_unmatched_serial_times_out() {
	let (dispatcher, driver, _) = dispatcher_with(FakeDriver::new());

	let response = get(&dispatcher, "/init?timeout=2000&serialno=HT[0-9]+").await;
	assert_eq!(response.status, Status::InternalError);
	assert_eq!(driver.connects(), 2);
}

#[tokio::test(start_paused = true)]
async fn concurrent_inits_create_one_session() {
	let (dispatcher, driver, device) = dispatcher_with(FakeDriver::new());
	let dispatcher = Arc::new(dispatcher);

	let tasks: Vec<_> = (0..4)
		.map(|_| {
			let dispatcher = Arc::clone(&dispatcher);
			tokio::spawn(async move { dispatcher.handle(CommandRequest::get("/init")).await })
		})
		.collect();

	let mut bodies = Vec::new();
	for task in tasks {
		bodies.push(task.await.unwrap().body);
	}
	bodies.sort();

	assert_eq!(bodies, vec!["already connected", "already connected", "already connected", "connected"]);
	assert_eq!(driver.connects(), 1);
	assert_eq!(device.dispose_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn gated_commands_see_not_ready_during_init() {
	let (dispatcher, _, _) = dispatcher_with(FakeDriver::new());
	let dispatcher = Arc::new(dispatcher);

	let init = {
		let dispatcher = Arc::clone(&dispatcher);
		tokio::spawn(async move { dispatcher.handle(CommandRequest::get("/init")).await })
	};
	// Let init enter its inter-attempt pause.
	tokio::time::sleep(Duration::from_millis(10)).await;

	assert_eq!(get(&dispatcher, "/wake").await.status, Status::Forbidden);
	assert_eq!(get(&dispatcher, "/dispose").await.status, Status::Forbidden);
	assert_eq!(init.await.unwrap().body, "connected");
}

#[tokio::test(start_paused = true)]
async fn dispose_waits_for_in_flight_command() {
	let (dispatcher, _, device) = connected().await;
	let dispatcher = Arc::new(dispatcher);
	device.set_shell_delay(Duration::from_millis(100));

	let shell = {
		let dispatcher = Arc::clone(&dispatcher);
		tokio::spawn(async move { dispatcher.handle(CommandRequest::post("/shell", "sleep 1")).await })
	};
	tokio::time::sleep(Duration::from_millis(10)).await;

	assert_eq!(get(&dispatcher, "/dispose").await.body, "disposed");
	assert_eq!(shell.await.unwrap().status, Status::Ok);

	let actions = device.actions();
	let shell_at = actions.iter().position(|a| *a == DeviceAction::Shell("sleep 1".into()));
	let dispose_at = actions.iter().position(|a| *a == DeviceAction::Dispose);
	assert!(shell_at.unwrap() < dispose_at.unwrap());
}

#[tokio::test]
async fn shutdown_disposes_live_session() {
	let (dispatcher, _, device) = connected().await;
	dispatcher.shutdown().await;
	assert_eq!(device.dispose_count(), 1);
	assert!(!dispatcher.is_connected().await);

	dispatcher.shutdown().await;
	assert_eq!(device.dispose_count(), 1);
}
