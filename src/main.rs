use clap::{Arg, ArgAction, Command};
use ext2_ghost::{hierarchy, timeline, Ext2Image};
use log::info;
use std::fs::File;
use std::io::BufReader;
use std::process::exit;

fn main() {
    env_logger::init();

    let matches = Command::new("ext2-ghost")
        .version("0.1.0")
        .about("Reconstruct the directory tree and creation/deletion history of an ext2 image.")
        .arg(
            Arg::new("image")
                .required(true)
                .help("Path to the raw ext2 image (opened read-only)."),
        )
        .arg(
            Arg::new("hierarchy")
                .required(true)
                .help("Output path for the reconstructed directory tree."),
        )
        .arg(
            Arg::new("history")
                .required(true)
                .help("Output path for the creation/deletion event log."),
        )
        .arg(
            Arg::new("superblock")
                .short('s')
                .long("superblock")
                .action(ArgAction::SetTrue)
                .help("Display the superblock information."),
        )
        .arg(
            Arg::new("groupdesc")
                .short('g')
                .long("groupdesc")
                .action(ArgAction::SetTrue)
                .help("Display the group descriptors."),
        )
        .arg(
            Arg::new("inode")
                .short('i')
                .long("inode")
                .value_parser(clap::value_parser!(u32))
                .help("Display the metadata of a specific inode number."),
        )
        .arg(
            Arg::new("json")
                .short('j')
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Render the inspection output as JSON."),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Print the image geometry after opening."),
        )
        .get_matches();

    let image_path = matches.get_one::<String>("image").unwrap();
    let hierarchy_path = matches.get_one::<String>("hierarchy").unwrap();
    let history_path = matches.get_one::<String>("history").unwrap();
    let json = matches.get_flag("json");

    let file = match File::open(image_path) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("cannot open image '{}': {}", image_path, err);
            exit(1);
        }
    };

    let mut fs = match Ext2Image::new(BufReader::new(file)) {
        Ok(fs) => fs,
        Err(err) => {
            eprintln!("ext2 image parsing error: {}", err);
            exit(1);
        }
    };
    info!(
        "opened '{}': {} inodes, {} blocks of {} bytes",
        image_path,
        fs.inodes_count(),
        fs.superblock.blocks_count(),
        fs.superblock.block_size()
    );
    if matches.get_flag("verbose") {
        println!(
            "{}: {} inodes, {} blocks of {} bytes",
            image_path,
            fs.inodes_count(),
            fs.superblock.blocks_count(),
            fs.superblock.block_size()
        );
    }

    if matches.get_flag("superblock") {
        if json {
            println!(
                "{}",
                serde_json::to_string_pretty(&fs.superblock.to_json()).unwrap_or_default()
            );
        } else {
            fs.superblock.print_sb_info();
        }
    }

    if matches.get_flag("groupdesc") {
        if json {
            let json_array: Vec<_> = fs.descriptors().iter().map(|gd| gd.to_json()).collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&json_array).unwrap_or_default()
            );
        } else {
            println!("{:#?}", fs.descriptors());
        }
    }

    if let Some(&inode_num) = matches.get_one::<u32>("inode") {
        match fs.get_inode(inode_num) {
            Ok(inode) => {
                if json {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&inode.to_json()).unwrap_or_default()
                    );
                } else {
                    println!("{}", inode.to_table());
                }
            }
            Err(err) => {
                eprintln!("{}", err);
                exit(1);
            }
        }
    }

    let tree = match hierarchy::dump(&mut fs) {
        Ok(tree) => tree,
        Err(err) => {
            eprintln!("hierarchy reconstruction error: {}", err);
            exit(1);
        }
    };
    if let Err(err) = std::fs::write(hierarchy_path, &tree) {
        eprintln!("cannot write '{}': {}", hierarchy_path, err);
        exit(1);
    }

    let events = timeline::build_timeline(&mut fs);
    if let Err(err) = std::fs::write(history_path, timeline::render_history(&events)) {
        eprintln!("cannot write '{}': {}", history_path, err);
        exit(1);
    }
}
